//! Media asset representation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Kind of media content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Parse the `type`/`kind` field of a payload media entry.
    pub fn from_payload(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "image" | "photo" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }

    /// Content label used when a single asset of this kind is downloaded.
    pub fn label(&self) -> ContentLabel {
        match self {
            MediaKind::Image => ContentLabel::Download,
            MediaKind::Video => ContentLabel::DownloadVideo,
        }
    }
}

/// Named video resolution class.
///
/// `Full` is the universal fallback when a preferred tier is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum QualityTier {
    #[serde(rename = "preview")]
    Preview,
    #[serde(rename = "240", alias = "240p")]
    P240,
    #[serde(rename = "720", alias = "720p")]
    P720,
    #[default]
    #[serde(rename = "full")]
    Full,
}

impl QualityTier {
    /// Map a numeric quality key from a payload (`"240"`, `"720"`) to a tier.
    pub fn from_payload_key(key: &str) -> Option<Self> {
        match key {
            "240" => Some(QualityTier::P240),
            "720" => Some(QualityTier::P720),
            "preview" => Some(QualityTier::Preview),
            _ => None,
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityTier::Preview => write!(f, "preview"),
            QualityTier::P240 => write!(f, "240"),
            QualityTier::P720 => write!(f, "720"),
            QualityTier::Full => write!(f, "full"),
        }
    }
}

impl FromStr for QualityTier {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "preview" => Ok(QualityTier::Preview),
            "240" | "240p" => Ok(QualityTier::P240),
            "720" | "720p" => Ok(QualityTier::P720),
            "full" => Ok(QualityTier::Full),
            _ => Err(format!("Unknown quality: {}", s)),
        }
    }
}

/// Video URLs keyed by quality tier. Every tier is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QualityMap {
    tiers: BTreeMap<QualityTier, String>,
}

impl QualityMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, tier: QualityTier, url: impl Into<String>) {
        self.tiers.insert(tier, url.into());
    }

    pub fn get(&self, tier: QualityTier) -> Option<&str> {
        self.tiers.get(&tier).map(String::as_str)
    }

    /// Pick the preferred tier, falling back to `full`.
    pub fn select(&self, preferred: QualityTier) -> Option<&str> {
        self.get(preferred).or_else(|| self.get(QualityTier::Full))
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

/// A resolved piece of media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaAsset {
    Image { url: String },
    Video { qualities: QualityMap },
}

impl MediaAsset {
    pub fn kind(&self) -> MediaKind {
        match self {
            MediaAsset::Image { .. } => MediaKind::Image,
            MediaAsset::Video { .. } => MediaKind::Video,
        }
    }

    /// URL for this asset at the preferred quality. Images ignore the tier.
    pub fn url_for(&self, preferred: QualityTier) -> Option<&str> {
        match self {
            MediaAsset::Image { url } => Some(url.as_str()),
            MediaAsset::Video { qualities } => qualities.select(preferred),
        }
    }
}

/// A post and its media in payload order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub id: String,
    pub media: Vec<MediaAsset>,
}

/// Label attached to a download control and to the requests it sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentLabel {
    #[serde(rename = "download")]
    Download,
    #[serde(rename = "download video")]
    DownloadVideo,
    #[serde(rename = "download all")]
    DownloadAll,
}

impl ContentLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentLabel::Download => "download",
            ContentLabel::DownloadVideo => "download video",
            ContentLabel::DownloadAll => "download all",
        }
    }

    /// MIME type assumed for the content when the URL carries no extension.
    pub fn assumed_mimetype(&self) -> &'static str {
        match self {
            ContentLabel::DownloadVideo => "video/mp4",
            _ => "image/jpeg",
        }
    }
}

impl fmt::Display for ContentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentLabel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "download" => Ok(ContentLabel::Download),
            "download video" => Ok(ContentLabel::DownloadVideo),
            "download all" => Ok(ContentLabel::DownloadAll),
            _ => Err(format!("Unknown content label: {}", s)),
        }
    }
}
