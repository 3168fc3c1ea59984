//! Filename generation and manipulation.

use std::path::Path;

use chrono::{DateTime, Local};

use crate::error::{Error, Result};
use crate::media::ContentLabel;

/// Validate and sanitize a filename by removing or replacing invalid characters.
///
/// Returns an error if the filename contains path traversal patterns.
pub fn sanitize_filename(name: &str) -> Result<String> {
    // Reject path traversal attempts
    if name.contains("..") {
        return Err(Error::InvalidFilename(format!(
            "Path traversal detected: '{}'",
            name
        )));
    }

    if name.contains('/') || name.contains('\\') {
        return Err(Error::InvalidFilename(format!(
            "Path separators not allowed in filename: '{}'",
            name
        )));
    }

    if name.contains('\0') {
        return Err(Error::InvalidFilename(format!(
            "Null bytes not allowed in filename: '{}'",
            name
        )));
    }

    let sanitized: String = name
        .chars()
        .map(|c| match c {
            ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if sanitized.trim().is_empty() {
        return Err(Error::InvalidFilename(
            "Filename cannot be empty or whitespace-only".to_string(),
        ));
    }

    Ok(sanitized)
}

/// Sanitize a creator identifier for use as a folder name.
///
/// Every character outside `[A-Za-z0-9]` becomes `_`, one for one.
pub fn sanitize_creator(creator_id: &str) -> String {
    creator_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Extract extension from a filename.
fn extension_of(filename: &str) -> Option<&str> {
    let (stem, ext) = filename.rsplit_once('.')?;
    if !stem.is_empty()
        && !ext.is_empty()
        && ext.len() <= 10
        && ext.chars().all(|c| c.is_ascii_alphanumeric())
    {
        Some(ext)
    } else {
        None
    }
}

/// Convert MIME type to file extension.
pub fn mime_to_extension(mimetype: &str) -> &'static str {
    match mimetype {
        // Images
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",

        // Videos
        "video/mp4" => "mp4",
        "video/webm" => "webm",
        "video/quicktime" => "mov",

        _ => "bin",
    }
}

/// The last path segment of a URL, ignoring query string and fragment.
fn url_basename(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    Some(segment.to_string())
}

/// Build the target filename for a download.
///
/// The base name is the URL's last path segment, given an extension from the
/// label when it has none, and prefixed with the creator folder when
/// `organize` is set. Any failure falls back to a timestamp placeholder.
pub fn synthesize_filename(
    url: &str,
    creator_id: &str,
    label: ContentLabel,
    organize: bool,
    now: DateTime<Local>,
) -> String {
    let ext = mime_to_extension(label.assumed_mimetype());

    let base = url_basename(url).and_then(|name| sanitize_filename(&name).ok());
    let Some(mut name) = base else {
        tracing::debug!("Could not derive a filename from {}, using placeholder", url);
        return placeholder_filename(ext, now);
    };

    if extension_of(&name).is_none() {
        name = format!("{}.{}", name, ext);
    }

    let creator = sanitize_creator(creator_id);
    if organize && !creator.is_empty() {
        format!("{}/{}", creator, name)
    } else {
        name
    }
}

/// Timestamp-based name used when nothing better can be derived.
pub fn placeholder_filename(ext: &str, now: DateTime<Local>) -> String {
    format!("fansly_{}.{}", now.format("%Y%m%d_%H%M%S_%3f"), ext)
}

/// Generate a unique filename by appending a number if the file exists.
pub fn make_unique_filename(path: &Path) -> std::path::PathBuf {
    if !path.exists() {
        return path.to_path_buf();
    }

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let parent = path.parent().unwrap_or(Path::new("."));

    let mut counter = 1;
    loop {
        let new_name = if ext.is_empty() {
            format!("{}_{}", stem, counter)
        } else {
            format!("{}_{}.{}", stem, counter, ext)
        };

        let new_path = parent.join(&new_name);
        if !new_path.exists() {
            return new_path;
        }

        counter += 1;
        if counter > 1000 {
            return new_path;
        }
    }
}
