//! Intercepted payload and messaging type definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Post or message identifier. The API sends both strings and numbers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PayloadId {
    Text(String),
    Number(u64),
}

impl PayloadId {
    pub fn into_string(self) -> String {
        match self {
            PayloadId::Text(s) => s,
            PayloadId::Number(n) => n.to_string(),
        }
    }
}

/// A post-like object from a feed, chat or single-post payload.
#[derive(Debug, Clone, Deserialize)]
pub struct PostPayload {
    #[serde(default)]
    pub id: Option<PayloadId>,
    #[serde(default)]
    pub media: Vec<Value>,
}

/// A single media entry inside a post.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaPayload {
    #[serde(rename = "type", alias = "kind")]
    pub kind: Option<String>,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub square_preview: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub source: Option<SourcePayload>,
    #[serde(default)]
    pub video_sources: HashMap<String, Value>,
}

impl MediaPayload {
    /// Preview, square-preview and thumbnail URLs that are present.
    pub fn preview_urls(&self) -> impl Iterator<Item = &str> {
        [&self.preview, &self.square_preview, &self.thumbnail]
            .into_iter()
            .filter_map(|u| u.as_deref())
            .filter(|u| !u.is_empty())
    }
}

/// Media source: either a bare URL or an object with `source` and quality keys.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SourcePayload {
    Url(String),
    Object(HashMap<String, Value>),
}

impl SourcePayload {
    /// The primary (full quality) URL.
    pub fn primary(&self) -> Option<&str> {
        match self {
            SourcePayload::Url(url) => Some(url.as_str()),
            SourcePayload::Object(map) => map.get("source").and_then(Value::as_str),
        }
        .filter(|u| !u.is_empty())
    }

    /// Additional string-valued keys of an object source.
    pub fn extra(&self) -> impl Iterator<Item = (&str, &str)> {
        let map = match self {
            SourcePayload::Object(map) => Some(map),
            SourcePayload::Url(_) => None,
        };
        map.into_iter()
            .flat_map(|m| m.iter())
            .filter_map(|(k, v)| v.as_str().map(|s| (k.as_str(), s)))
    }
}

/// An outbound request observed by the host.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptedRequest {
    pub url: String,
    #[serde(default)]
    pub tab_id: Option<i64>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Event forwarded to the document side after a successful refetch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDataEvent {
    #[serde(rename = "type")]
    pub event_type: &'static str,
    pub data: Value,
    pub is_for_dm: bool,
    pub headers: BTreeMap<String, String>,
}

impl ApiDataEvent {
    pub fn new(data: Value, is_for_dm: bool, headers: BTreeMap<String, String>) -> Self {
        Self {
            event_type: "apiData",
            data,
            is_for_dm,
            headers,
        }
    }
}

/// Acknowledgement returned for every download message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Ack {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}
