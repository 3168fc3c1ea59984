//! Host download and notification services.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Serialize;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::error::{Error, Result};
use crate::fs::{ensure_dir, make_unique_filename, resolve_target};
use crate::output::create_download_bar;

/// Minimum file size to show progress bar (20 MB).
const PROGRESS_THRESHOLD: u64 = 20 * 1024 * 1024;

/// What to do when the target filename already exists.
///
/// Downloads never overwrite; a numeric suffix is added instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    Uniquify,
}

/// A request to the host download service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadOptions {
    pub url: String,
    pub filename: String,
    pub conflict_policy: ConflictPolicy,
    pub prompt_user: bool,
}

impl DownloadOptions {
    /// Options used for every queued download: uniquify, never prompt.
    pub fn new(url: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            filename: filename.into(),
            conflict_policy: ConflictPolicy::Uniquify,
            prompt_user: false,
        }
    }
}

/// Opaque identifier of an accepted download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadHandle(pub String);

/// The host's download facility.
#[async_trait]
pub trait DownloadService: Send + Sync {
    /// Run one download to completion.
    async fn download(&self, options: DownloadOptions) -> Result<DownloadHandle>;
}

/// Fire-and-forget user notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

/// Downloads straight to a directory on disk.
pub struct FileDownloadService {
    client: Client,
    base_dir: PathBuf,
}

impl FileDownloadService {
    pub fn new(base_dir: impl Into<PathBuf>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Http)?;
        Ok(Self {
            client,
            base_dir: base_dir.into(),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    async fn stream_to(&self, url: &str, output_path: &Path) -> Result<()> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Download(format!("HTTP {} for {}", status.as_u16(), url)));
        }

        let content_length = response.content_length();
        let progress = content_length
            .filter(|l| *l > PROGRESS_THRESHOLD)
            .map(|l| {
                let name = output_path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                create_download_bar(l, &name)
            });

        let mut file = File::create(output_path).await?;
        let mut stream = response.bytes_stream();
        let mut downloaded: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Download(format!("Stream error: {}", e)))?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            if let Some(ref pb) = progress {
                pb.set_position(downloaded);
            }
        }

        file.flush().await?;

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        Ok(())
    }
}

#[async_trait]
impl DownloadService for FileDownloadService {
    async fn download(&self, options: DownloadOptions) -> Result<DownloadHandle> {
        let target = resolve_target(&self.base_dir, &options.filename)?;
        if let Some(parent) = target.parent() {
            ensure_dir(parent)?;
        }
        let target = match options.conflict_policy {
            ConflictPolicy::Uniquify => make_unique_filename(&target),
        };

        if let Err(e) = self.stream_to(&options.url, &target).await {
            let _ = tokio::fs::remove_file(&target).await;
            return Err(e);
        }

        tracing::info!("Saved {}", target.display());
        Ok(DownloadHandle(target.display().to_string()))
    }
}

/// Records every download instead of performing it.
///
/// Used as the service for dry runs and in tests.
#[derive(Default, Clone)]
pub struct RecordingService {
    calls: Arc<Mutex<Vec<(tokio::time::Instant, DownloadOptions)>>>,
    fail_urls: Arc<Mutex<Vec<String>>>,
    latency: Duration,
}

impl RecordingService {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            ..Default::default()
        }
    }

    /// Make downloads of `url` fail.
    pub fn fail_on(&self, url: impl Into<String>) {
        self.fail_urls.lock().push(url.into());
    }

    /// Start time and options of every download so far.
    pub fn calls(&self) -> Vec<(tokio::time::Instant, DownloadOptions)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl DownloadService for RecordingService {
    async fn download(&self, options: DownloadOptions) -> Result<DownloadHandle> {
        let started = tokio::time::Instant::now();
        self.calls.lock().push((started, options.clone()));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.fail_urls.lock().contains(&options.url) {
            return Err(Error::Download(format!("rejected {}", options.url)));
        }
        Ok(DownloadHandle(options.filename))
    }
}

/// Collects notifications in memory.
#[derive(Default, Clone)]
pub struct RecordingNotifier {
    messages: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, title: &str, message: &str) {
        self.messages.lock().push((title.to_string(), message.to_string()));
    }
}
