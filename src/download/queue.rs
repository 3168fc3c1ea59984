//! Serialized download queue.
//!
//! Requests are executed one at a time in arrival order with a fixed
//! cool-down between transfers. A drain task is spawned on demand and exits
//! when the queue runs dry.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use parking_lot::Mutex;
use tokio::sync::{watch, Notify};

use crate::config::Settings;
use crate::download::request::DownloadRequest;
use crate::download::service::{DownloadOptions, DownloadService, Notifier};
use crate::error::{Error, Result};
use crate::fs::synthesize_filename;

/// Default pause between consecutive transfers.
pub const DEFAULT_COOL_DOWN: Duration = Duration::from_millis(100);

/// Lifecycle of a queued download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Pending,
    InFlight,
    Done,
    Failed,
}

/// A request with its synthesized filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadItem {
    pub request: DownloadRequest,
    pub filename: String,
    pub status: ItemStatus,
}

/// Terminal outcome counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub done: u64,
    pub failed: u64,
}

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<DownloadItem>,
    in_flight: Option<DownloadItem>,
    draining: bool,
    closed: bool,
    stats: QueueStats,
}

struct Inner {
    state: Mutex<QueueState>,
    service: Arc<dyn DownloadService>,
    notifier: Arc<dyn Notifier>,
    settings: watch::Receiver<Settings>,
    cool_down: Duration,
    idle: Notify,
}

/// FIFO download queue with a single executor.
#[derive(Clone)]
pub struct DownloadQueue {
    inner: Arc<Inner>,
}

impl DownloadQueue {
    pub fn new(
        service: Arc<dyn DownloadService>,
        notifier: Arc<dyn Notifier>,
        settings: watch::Receiver<Settings>,
        cool_down: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(QueueState::default()),
                service,
                notifier,
                settings,
                cool_down,
                idle: Notify::new(),
            }),
        }
    }

    /// Append a request and start the drain task if none is running.
    ///
    /// Returns the synthesized filename. Must be called from within a tokio runtime.
    pub fn enqueue(&self, request: DownloadRequest) -> Result<String> {
        let settings = *self.inner.settings.borrow();
        let filename = synthesize_filename(
            &request.url,
            &request.creator_id,
            request.label,
            settings.auto_create_folder,
            Local::now(),
        );

        let start_drain = {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(Error::QueueClosed);
            }
            state.items.push_back(DownloadItem {
                request,
                filename: filename.clone(),
                status: ItemStatus::Pending,
            });
            !std::mem::replace(&mut state.draining, true)
        };

        tracing::debug!("Queued {}", filename);
        if start_drain {
            tokio::spawn(drain(self.inner.clone()));
        }
        Ok(filename)
    }

    /// Refuse further requests. Items already queued still run.
    pub fn close(&self) {
        self.inner.state.lock().closed = true;
    }

    /// Number of items waiting to start.
    pub fn len(&self) -> usize {
        self.inner.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The item currently being transferred.
    pub fn in_flight(&self) -> Option<DownloadItem> {
        self.inner.state.lock().in_flight.clone()
    }

    pub fn is_idle(&self) -> bool {
        let state = self.inner.state.lock();
        !state.draining && state.items.is_empty()
    }

    /// Wait until every queued item has finished.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    pub fn stats(&self) -> QueueStats {
        self.inner.state.lock().stats
    }
}

async fn drain(inner: Arc<Inner>) {
    loop {
        let next = {
            let mut state = inner.state.lock();
            match state.items.pop_front() {
                Some(mut item) => {
                    item.status = ItemStatus::InFlight;
                    state.in_flight = Some(item.clone());
                    Some(item)
                }
                None => {
                    state.draining = false;
                    None
                }
            }
        };
        let Some(mut item) = next else {
            inner.idle.notify_waiters();
            return;
        };

        tracing::info!("Downloading {} -> {}", item.request.url, item.filename);
        let options = DownloadOptions::new(item.request.url.clone(), item.filename.clone());
        item.status = match inner.service.download(options).await {
            Ok(_) => ItemStatus::Done,
            Err(e) => {
                tracing::warn!("Download of {} failed: {}", item.filename, e);
                inner
                    .notifier
                    .notify("Download failed", &format!("Could not download {}: {}", item.filename, e));
                ItemStatus::Failed
            }
        };

        {
            let mut state = inner.state.lock();
            state.in_flight = None;
            match item.status {
                ItemStatus::Done => state.stats.done += 1,
                _ => state.stats.failed += 1,
            }
        }

        tokio::time::sleep(inner.cool_down).await;
    }
}
