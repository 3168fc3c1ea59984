//! Authenticated refetch of intercepted API requests.

use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value;

use crate::error::{Error, Result};

/// Headers never replayed: browser fingerprinting and connection-level headers.
pub const DEFAULT_HEADER_DENYLIST: &[&str] = &[
    "sec-ch-ua",
    "sec-ch-ua-mobile",
    "sec-ch-ua-platform",
    "sec-fetch-dest",
    "sec-fetch-mode",
    "sec-fetch-site",
    "sec-fetch-user",
    "host",
    "connection",
    "content-length",
];

/// Replays captured request headers against the same URL.
///
/// Credentials come only from the captured headers; the client never signs or
/// authenticates requests on its own.
pub struct RefetchClient {
    client: Client,
    denylist: HashSet<String>,
}

impl RefetchClient {
    /// Create a client with a header denylist and request timeout.
    pub fn new<S: AsRef<str>>(denylist: &[S], timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            denylist: denylist
                .iter()
                .map(|h| h.as_ref().to_ascii_lowercase())
                .collect(),
        })
    }

    /// Captured headers minus the denylist.
    pub fn replay_headers(&self, captured: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        captured
            .iter()
            .filter(|(name, _)| !self.denylist.contains(&name.to_ascii_lowercase()))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// GET `url` with the captured headers and parse the body as JSON.
    pub async fn fetch_json(&self, url: &str, captured: &BTreeMap<String, String>) -> Result<Value> {
        let headers = build_header_map(&self.replay_headers(captured));

        tracing::debug!("GET {}", url);

        let response = self.client.get(url).headers(headers).send().await?;
        let status = response.status();
        tracing::debug!("Response status: {}", status);

        if !status.is_success() {
            return Err(Error::RefetchStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let text = response.text().await?;
        let value = serde_json::from_str(&text).map_err(|e| {
            Error::Payload(format!(
                "Malformed JSON: {} - Response: {}",
                e,
                text.chars().take(200).collect::<String>()
            ))
        })?;

        Ok(value)
    }
}

/// Convert header pairs, skipping any the HTTP stack would reject.
fn build_header_map(headers: &BTreeMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => tracing::debug!("Dropping unreplayable header: {}", name),
        }
    }
    map
}
