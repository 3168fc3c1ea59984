//! Correlation store: preview fingerprints and post ids to resolved media.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::RwLock;
use serde_json::Value;

use crate::media::fingerprint::fingerprint;
use crate::media::item::{MediaAsset, PostRecord, QualityTier};
use crate::media::parser::parse_payload;

/// Default number of fingerprints (and posts) kept.
pub const DEFAULT_CAPACITY: usize = 5000;

/// Store shared between interception (writer) and resolution (reader).
pub type SharedStore = Arc<RwLock<CorrelationStore>>;

struct Entry<T> {
    value: T,
    written_at: Instant,
}

/// Bounded mapping from asset identifiers to resolved media.
///
/// Writes for an existing key overwrite it (last writer wins). Entries leave
/// only through LRU eviction at capacity or by outliving the TTL.
pub struct CorrelationStore {
    assets: LruCache<String, Entry<MediaAsset>>,
    posts: LruCache<String, Entry<PostRecord>>,
    ttl: Option<Duration>,
}

/// Counts of what a single payload wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordSummary {
    pub posts: usize,
    pub fingerprints: usize,
}

impl CorrelationStore {
    /// Create a store holding at most `capacity` fingerprints and `capacity` posts.
    pub fn new(capacity: NonZeroUsize, ttl: Option<Duration>) -> Self {
        Self {
            assets: LruCache::new(capacity),
            posts: LruCache::new(capacity),
            ttl,
        }
    }

    /// Wrap a new store for sharing.
    pub fn shared(capacity: NonZeroUsize, ttl: Option<Duration>) -> SharedStore {
        Arc::new(RwLock::new(Self::new(capacity, ttl)))
    }

    /// Record every post and media entry found in an intercepted payload.
    ///
    /// Unrecognised payload shapes write nothing. Expired entries are dropped
    /// first so they do not hold LRU slots.
    pub fn record_response(&mut self, endpoint_url: &str, payload: &Value) -> RecordSummary {
        let pruned = self.prune_expired();
        if pruned > 0 {
            tracing::debug!("Pruned {} expired entries", pruned);
        }
        let mut summary = RecordSummary::default();

        for post in parse_payload(payload) {
            if let Some(record) = post.record() {
                self.insert_post(record);
                summary.posts += 1;
            }
            for media in post.media {
                for key in &media.fingerprints {
                    self.insert_asset(key, media.asset.clone());
                    summary.fingerprints += 1;
                }
            }
        }

        tracing::debug!(
            "Recorded {} posts / {} fingerprints from {}",
            summary.posts,
            summary.fingerprints,
            endpoint_url
        );
        summary
    }

    pub fn insert_post(&mut self, record: PostRecord) {
        self.posts.put(
            record.id.clone(),
            Entry {
                value: record,
                written_at: Instant::now(),
            },
        );
    }

    /// Store an asset under the fingerprint of `preview_url`.
    pub fn insert_asset(&mut self, preview_url: &str, asset: MediaAsset) {
        let key = fingerprint(preview_url);
        if key.is_empty() {
            return;
        }
        self.assets.put(
            key.to_string(),
            Entry {
                value: asset,
                written_at: Instant::now(),
            },
        );
    }

    /// Look up an asset by any preview URL; the query string is ignored.
    pub fn asset(&self, preview_url: &str) -> Option<&MediaAsset> {
        self.assets
            .peek(fingerprint(preview_url))
            .filter(|e| self.is_fresh(e.written_at))
            .map(|e| &e.value)
    }

    pub fn post(&self, post_id: &str) -> Option<&PostRecord> {
        self.posts
            .peek(post_id)
            .filter(|e| self.is_fresh(e.written_at))
            .map(|e| &e.value)
    }

    /// Resolve a preview URL to the best source URL for `preferred`.
    pub fn resolve_fingerprint(&self, preview_url: &str, preferred: QualityTier) -> Option<String> {
        self.asset(preview_url)
            .and_then(|asset| asset.url_for(preferred))
            .map(str::to_string)
    }

    /// Drop every entry older than the TTL. Returns how many were removed.
    pub fn prune_expired(&mut self) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };
        let now = Instant::now();

        let stale_assets: Vec<String> = self
            .assets
            .iter()
            .filter(|(_, e)| now.duration_since(e.written_at) > ttl)
            .map(|(k, _)| k.clone())
            .collect();
        let stale_posts: Vec<String> = self
            .posts
            .iter()
            .filter(|(_, e)| now.duration_since(e.written_at) > ttl)
            .map(|(k, _)| k.clone())
            .collect();

        for key in &stale_assets {
            self.assets.pop(key);
        }
        for key in &stale_posts {
            self.posts.pop(key);
        }

        stale_assets.len() + stale_posts.len()
    }

    pub fn fingerprint_count(&self) -> usize {
        self.assets.len()
    }

    pub fn post_count(&self) -> usize {
        self.posts.len()
    }

    fn is_fresh(&self, written_at: Instant) -> bool {
        self.ttl
            .map(|ttl| written_at.elapsed() <= ttl)
            .unwrap_or(true)
    }
}

impl Default for CorrelationStore {
    fn default() -> Self {
        Self::new(
            NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            None,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::item::QualityMap;
    use serde_json::json;

    fn scenario_payload() -> Value {
        json!({
            "id": "42",
            "media": [{
                "type": "video",
                "preview": "https://x/p.jpg?z=1",
                "source": {"source": "https://x/full.mp4"},
                "videoSources": {"720": "https://x/720.mp4"}
            }]
        })
    }

    #[test]
    fn test_record_response_resolves_by_quality() {
        let mut store = CorrelationStore::default();
        let summary = store.record_response("https://apiv3.fansly.com/api/v1/post?ids=42", &scenario_payload());

        assert_eq!(summary, RecordSummary { posts: 1, fingerprints: 1 });
        assert_eq!(
            store.resolve_fingerprint("https://x/p.jpg", QualityTier::P720).as_deref(),
            Some("https://x/720.mp4")
        );
        assert_eq!(
            store.resolve_fingerprint("https://x/p.jpg", QualityTier::Full).as_deref(),
            Some("https://x/full.mp4")
        );
        assert_eq!(store.post("42").unwrap().media.len(), 1);
    }

    #[test]
    fn test_lookup_is_query_insensitive() {
        let mut store = CorrelationStore::default();
        store.insert_asset(
            "https://x/a.jpg?sig=1",
            MediaAsset::Image {
                url: "https://x/full.jpg".into(),
            },
        );

        let a = store.asset("https://x/a.jpg?x=1");
        let b = store.asset("https://x/a.jpg?y=2");
        let c = store.asset("https://x/a.jpg");
        assert!(a.is_some());
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_last_writer_wins() {
        let mut store = CorrelationStore::default();
        store.insert_asset("https://x/a.jpg", MediaAsset::Image { url: "one".into() });
        store.insert_asset("https://x/a.jpg?v=2", MediaAsset::Image { url: "two".into() });

        assert_eq!(
            store.resolve_fingerprint("https://x/a.jpg", QualityTier::Full).as_deref(),
            Some("two")
        );
        assert_eq!(store.fingerprint_count(), 1);
    }

    #[test]
    fn test_missing_tier_without_full_is_none() {
        let mut store = CorrelationStore::default();
        let mut qualities = QualityMap::new();
        qualities.insert(QualityTier::P240, "https://x/240.mp4");
        store.insert_asset("https://x/v.jpg", MediaAsset::Video { qualities });

        assert_eq!(store.resolve_fingerprint("https://x/v.jpg", QualityTier::P720), None);
        assert_eq!(
            store.resolve_fingerprint("https://x/v.jpg", QualityTier::P240).as_deref(),
            Some("https://x/240.mp4")
        );
    }

    #[test]
    fn test_malformed_payloads_store_nothing() {
        let mut store = CorrelationStore::default();
        for payload in [json!({}), Value::Null, json!("string"), json!(12)] {
            let summary = store.record_response("https://x/api", &payload);
            assert_eq!(summary, RecordSummary::default());
        }
        assert_eq!(store.fingerprint_count(), 0);
        assert_eq!(store.post_count(), 0);
    }

    #[test]
    fn test_capacity_evicts_least_recent() {
        let mut store = CorrelationStore::new(NonZeroUsize::new(2).unwrap(), None);
        store.insert_asset("https://x/1.jpg", MediaAsset::Image { url: "1".into() });
        store.insert_asset("https://x/2.jpg", MediaAsset::Image { url: "2".into() });
        store.insert_asset("https://x/3.jpg", MediaAsset::Image { url: "3".into() });

        assert!(store.asset("https://x/1.jpg").is_none());
        assert!(store.asset("https://x/3.jpg").is_some());
        assert_eq!(store.fingerprint_count(), 2);
    }

    #[test]
    fn test_ttl_expires_entries() {
        let mut store =
            CorrelationStore::new(NonZeroUsize::new(8).unwrap(), Some(Duration::from_millis(0)));
        store.insert_asset("https://x/1.jpg", MediaAsset::Image { url: "1".into() });
        std::thread::sleep(Duration::from_millis(5));

        assert!(store.asset("https://x/1.jpg").is_none());
        assert_eq!(store.prune_expired(), 1);
        assert_eq!(store.fingerprint_count(), 0);
    }

    #[test]
    fn test_recording_prunes_expired_entries() {
        let mut store =
            CorrelationStore::new(NonZeroUsize::new(8).unwrap(), Some(Duration::from_millis(50)));
        store.insert_asset("https://x/old.jpg", MediaAsset::Image { url: "old".into() });
        store.insert_post(PostRecord {
            id: "7".into(),
            media: Vec::new(),
        });
        std::thread::sleep(Duration::from_millis(80));

        store.record_response("https://apiv3.fansly.com/api/v1/post?ids=42", &scenario_payload());

        assert_eq!(store.fingerprint_count(), 1);
        assert_eq!(store.post_count(), 1);
    }
}
