//! Preview URL fingerprints.

/// Strip the query string and fragment from a preview URL.
///
/// The result is the join key between low-resolution previews in the
/// document and the high-resolution sources seen in API payloads.
pub fn fingerprint(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    url[..end].trim()
}
