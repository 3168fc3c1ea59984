//! Download requests as exchanged with the page side.

use serde_json::Value;

use crate::error::{Error, Result};
use crate::media::ContentLabel;

/// One asset the user asked to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub creator_id: String,
    pub label: ContentLabel,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, creator_id: impl Into<String>, label: ContentLabel) -> Self {
        Self {
            url: url.into(),
            creator_id: creator_id.into(),
            label,
        }
    }

    /// The `[url, creatorId, label]` triple sent to the host.
    pub fn to_message(&self) -> Value {
        serde_json::json!([self.url, self.creator_id, self.label.as_str()])
    }
}

/// Parse a `[url, creatorId, label]` triple.
///
/// A missing creator becomes an empty string; an unknown label falls back to
/// a plain download.
pub fn parse_message(value: &Value) -> Result<DownloadRequest> {
    let items = value
        .as_array()
        .filter(|a| a.len() == 3)
        .ok_or_else(|| Error::MalformedMessage("expected a [url, creatorId, label] triple".to_string()))?;

    let url = items[0]
        .as_str()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| Error::MalformedMessage("missing download url".to_string()))?;

    let creator_id = match &items[1] {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    };

    let label = items[2]
        .as_str()
        .and_then(|l| l.parse::<ContentLabel>().ok())
        .unwrap_or(ContentLabel::Download);

    Ok(DownloadRequest::new(url, creator_id, label))
}
