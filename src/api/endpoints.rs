//! Watched endpoint families.

use regex::Regex;

use crate::error::{Error, Result};

/// Fansly API base URL.
pub const API_BASE: &str = "https://apiv3.fansly.com";

/// Fragment appended to URLs we fetch ourselves so they are not intercepted again.
pub const REFETCH_MARKER: &str = "fgrab-refetch";

/// Family of an intercepted endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointFamily {
    /// Creator timelines and account media listings.
    UserListing,
    /// Single posts and post batches.
    PostListing,
    /// Direct message threads.
    ChatListing,
    /// Any other API path ending in a numeric id.
    GenericNumericPath,
}

impl EndpointFamily {
    /// Whether payloads of this family belong to a chat thread.
    pub fn is_for_dm(&self) -> bool {
        matches!(self, EndpointFamily::ChatListing)
    }
}

/// Classifies request URLs into endpoint families.
#[derive(Debug, Clone)]
pub struct EndpointMatcher {
    patterns: Vec<(EndpointFamily, Regex)>,
}

impl EndpointMatcher {
    /// Build the matcher for an API base URL.
    pub fn new(api_base: &str) -> Result<Self> {
        let base = regex::escape(api_base.trim_end_matches('/'));
        let specs = [
            (
                EndpointFamily::ChatListing,
                format!(r"^{}/api/v1/(message|messaging/groups?)([/?]|$)", base),
            ),
            (
                EndpointFamily::PostListing,
                format!(r"^{}/api/v1/(post|account/media)([/?]|$)", base),
            ),
            (
                EndpointFamily::UserListing,
                format!(r"^{}/api/v1/(timelinenew|timeline|mediaoffers/location)/", base),
            ),
            (
                EndpointFamily::GenericNumericPath,
                format!(r"^{}/api/v1/[a-z/]+/\d+([/?#]|$)", base),
            ),
        ];

        let patterns = specs
            .into_iter()
            .map(|(family, pattern)| {
                Regex::new(&pattern)
                    .map(|re| (family, re))
                    .map_err(|e| Error::Config(format!("Invalid endpoint pattern: {}", e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }

    /// Family of a request URL, or `None` if it is not watched.
    pub fn classify(&self, url: &str) -> Option<EndpointFamily> {
        self.patterns
            .iter()
            .find(|(_, re)| re.is_match(url))
            .map(|(family, _)| *family)
    }
}

/// Tag a URL as one of our own refetches.
pub fn mark_refetch(url: &str) -> String {
    if url.contains('#') {
        format!("{}&{}", url, REFETCH_MARKER)
    } else {
        format!("{}#{}", url, REFETCH_MARKER)
    }
}

/// Whether a URL carries the refetch marker in its fragment.
pub fn is_refetch(url: &str) -> bool {
    url.split_once('#')
        .map(|(_, fragment)| fragment.split('&').any(|part| part == REFETCH_MARKER))
        .unwrap_or(false)
}
