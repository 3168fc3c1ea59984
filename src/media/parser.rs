//! Payload normalization and media parsing.

use serde_json::Value;

use crate::api::types::{MediaPayload, PostPayload};
use crate::media::fingerprint::fingerprint;
use crate::media::item::{MediaAsset, MediaKind, PostRecord, QualityMap, QualityTier};

/// A media entry ready for the store: the asset and every fingerprint it is reachable by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMedia {
    pub fingerprints: Vec<String>,
    pub asset: MediaAsset,
}

/// A post-like object after parsing.
#[derive(Debug, Clone, Default)]
pub struct ParsedPost {
    pub id: Option<String>,
    pub media: Vec<ParsedMedia>,
}

impl ParsedPost {
    /// The record to store, if the object carried an id.
    pub fn record(&self) -> Option<PostRecord> {
        self.id.as_ref().map(|id| PostRecord {
            id: id.clone(),
            media: self.media.iter().map(|m| m.asset.clone()).collect(),
        })
    }
}

/// Normalize a raw payload into post-like objects.
///
/// Accepts an array, a `{list: [...]}` envelope, or a single object with its
/// own `media` array. Any other shape yields nothing.
pub fn normalize_payload(payload: &Value) -> Vec<PostPayload> {
    let items: Vec<&Value> = match payload {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => match (map.get("list"), map.get("media")) {
            (Some(Value::Array(list)), _) => list.iter().collect(),
            (_, Some(Value::Array(_))) => vec![payload],
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    items
        .into_iter()
        .filter(|item| item.is_object())
        .filter_map(|item| match serde_json::from_value::<PostPayload>(item.clone()) {
            Ok(post) => Some(post),
            Err(e) => {
                tracing::debug!("Skipping unparseable post-like object: {}", e);
                None
            }
        })
        .collect()
}

/// Parse every post-like object in a payload.
pub fn parse_payload(payload: &Value) -> Vec<ParsedPost> {
    normalize_payload(payload)
        .into_iter()
        .map(parse_post)
        .collect()
}

/// Parse one post-like object, keeping media entries that yield a URL.
pub fn parse_post(post: PostPayload) -> ParsedPost {
    let media = post
        .media
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<MediaPayload>(entry) {
            Ok(media) => parse_media(&media),
            Err(e) => {
                tracing::debug!("Skipping unparseable media entry: {}", e);
                None
            }
        })
        .collect();

    ParsedPost {
        id: post.id.map(|id| id.into_string()),
        media,
    }
}

/// Parse a media entry into an asset keyed by its preview fingerprints.
pub fn parse_media(media: &MediaPayload) -> Option<ParsedMedia> {
    let kind = media.kind.as_deref().and_then(MediaKind::from_payload)?;

    let asset = match kind {
        MediaKind::Video => MediaAsset::Video {
            qualities: build_quality_map(media)?,
        },
        MediaKind::Image => MediaAsset::Image {
            url: media.source.as_ref()?.primary()?.to_string(),
        },
    };

    let mut fingerprints: Vec<String> = Vec::new();
    for url in media.preview_urls() {
        let key = fingerprint(url).to_string();
        if !key.is_empty() && !fingerprints.contains(&key) {
            fingerprints.push(key);
        }
    }

    Some(ParsedMedia {
        fingerprints,
        asset,
    })
}

/// Build the quality map for a video entry.
///
/// `source.source` becomes `full`; numeric keys come from `videoSources` or
/// from the source object itself.
fn build_quality_map(media: &MediaPayload) -> Option<QualityMap> {
    let mut map = QualityMap::new();

    if let Some(source) = &media.source {
        if let Some(full) = source.primary() {
            map.insert(QualityTier::Full, full);
        }
        for (key, url) in source.extra() {
            if let Some(tier) = QualityTier::from_payload_key(key) {
                if !url.is_empty() {
                    map.insert(tier, url);
                }
            }
        }
    }

    for (key, value) in &media.video_sources {
        let (Some(tier), Some(url)) = (QualityTier::from_payload_key(key), value.as_str()) else {
            continue;
        };
        if !url.is_empty() {
            map.insert(tier, url);
        }
    }

    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}
