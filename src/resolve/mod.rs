//! URL resolution cascade.
//!
//! The document often renders a player before its source URL is attached, so
//! strategies run from most authoritative to best guess and the first hit wins.

pub mod assets;
pub mod strategies;

use crate::media::ContentLabel;

pub use assets::{group_action, resolve_container, ControlSpec, THUMBNAIL_PROXIMITY};
pub use strategies::ResolveContext;

/// A usable URL and the label its control should carry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedUrl {
    pub url: String,
    pub label: ContentLabel,
}

/// A single extraction strategy.
pub type Strategy = fn(&ResolveContext<'_>) -> Option<ResolvedUrl>;

/// Strategies in cascade order.
pub const CASCADE: [(&str, Strategy); 6] = [
    ("original-source", strategies::original_source),
    ("any-source", strategies::any_source),
    ("direct-src", strategies::direct_src),
    ("correlation-store", strategies::correlation_lookup),
    ("data-attributes", strategies::data_attributes),
    ("exhaustive-scan", strategies::exhaustive_scan),
];

/// Resolve the best URL for one asset container. `None` is a miss, not an error.
pub fn resolve(ctx: &ResolveContext<'_>) -> Option<ResolvedUrl> {
    CASCADE.iter().find_map(|(name, strategy)| {
        let resolved = strategy(ctx)?;
        tracing::debug!("Resolved {:?} via {}: {}", ctx.container, name, resolved.url);
        Some(resolved)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{DefaultMarkup, Document};
    use crate::media::{MediaAsset, QualityMap, QualityTier};
    use crate::store::CorrelationStore;

    #[test]
    fn test_cascade_prefers_source_over_store() {
        let mut doc = Document::new("https://fansly.com/home");
        let mut store = CorrelationStore::default();
        let root = doc.root();
        let container = doc.element("div", &[("data-post-id", "42")]);
        let video = doc.element("video", &[("poster", "https://x/p.jpg")]);
        doc.append_child(root, container);
        doc.append_child(container, video);

        let mut qualities = QualityMap::new();
        qualities.insert(QualityTier::Full, "https://x/full.mp4");
        store.insert_asset("https://x/p.jpg", MediaAsset::Video { qualities });

        let ctx = ResolveContext {
            doc: &doc,
            container,
            store: &store,
            markup: &DefaultMarkup,
            quality: QualityTier::Full,
        };
        assert_eq!(resolve(&ctx).unwrap().url, "https://x/full.mp4");

        let source = doc.element("source", &[("src", "https://x/source.mp4")]);
        doc.append_child(video, source);
        let ctx = ResolveContext {
            doc: &doc,
            container,
            store: &store,
            markup: &DefaultMarkup,
            quality: QualityTier::Full,
        };
        assert_eq!(resolve(&ctx).unwrap().url, "https://x/source.mp4");
    }

    #[test]
    fn test_cascade_miss_is_none() {
        let mut doc = Document::new("https://fansly.com/home");
        let store = CorrelationStore::default();
        let root = doc.root();
        let container = doc.element("div", &[("data-post-id", "1")]);
        let video = doc.element("video", &[("src", "blob:https://fansly.com/x")]);
        doc.append_child(root, container);
        doc.append_child(container, video);

        let ctx = ResolveContext {
            doc: &doc,
            container,
            store: &store,
            markup: &DefaultMarkup,
            quality: QualityTier::P720,
        };
        assert!(resolve(&ctx).is_none());
    }
}
