//! Download module for queued media retrieval.
//!
//! This module provides:
//! - Download requests exchanged with the page side
//! - The serialized download queue
//! - Host download and notification services

pub mod queue;
pub mod request;
pub mod service;

pub use queue::{DownloadItem, DownloadQueue, ItemStatus, QueueStats, DEFAULT_COOL_DOWN};
pub use request::{parse_message, DownloadRequest};
pub use service::{
    ConflictPolicy, DownloadHandle, DownloadOptions, DownloadService, FileDownloadService,
    Notifier, RecordingNotifier, RecordingService,
};
