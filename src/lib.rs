//! Fansly Grabber - resolve and download full-quality Fansly media.
//!
//! The page only ever shows previews; the real media URLs arrive in API
//! responses. This library joins the two and turns user actions into a
//! serialized download queue.
//!
//! # Components
//!
//! - [`store`]: correlation store fed by intercepted API responses
//! - [`api`]: request interception and authenticated refetch
//! - [`resolve`]: URL resolution cascade for a media container
//! - [`page`]: document observation and download control injection
//! - [`download`]: FIFO download queue and host services
//! - [`bridge`]: JSON-lines host bridge used by the binary
//!
//! # Example
//!
//! ```no_run
//! use std::num::NonZeroUsize;
//! use fansly_grabber::{media::QualityTier, store::{CorrelationStore, DEFAULT_CAPACITY}};
//!
//! let store = CorrelationStore::shared(NonZeroUsize::new(DEFAULT_CAPACITY).unwrap(), None);
//! let payload = serde_json::json!({"id": "1", "media": []});
//! store.write().record_response("https://apiv3.fansly.com/api/v1/post?ids=1", &payload);
//! assert!(store.read().resolve_fingerprint("https://x/p.jpg", QualityTier::Full).is_none());
//! ```

pub mod api;
pub mod bridge;
pub mod cli;
pub mod config;
pub mod dom;
pub mod download;
pub mod error;
pub mod fs;
pub mod media;
pub mod output;
pub mod page;
pub mod resolve;
pub mod store;

// Re-exports for convenience
pub use api::Interceptor;
pub use bridge::Bridge;
pub use config::{Config, Settings, SettingsHandle};
pub use download::{DownloadQueue, DownloadRequest};
pub use error::{Error, Result};
pub use media::{ContentLabel, MediaAsset, QualityTier};
pub use page::{PageController, PageRuntime};
pub use store::{CorrelationStore, SharedStore};
