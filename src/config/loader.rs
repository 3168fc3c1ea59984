//! Configuration structures and loading logic.

use crate::api::DEFAULT_HEADER_DENYLIST;
use crate::error::{Error, Result};
use crate::media::QualityTier;
use crate::store::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub download: DownloadConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub intercept: InterceptConfig,
}

/// User preferences that can change while running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Preferred video quality tier.
    #[serde(default)]
    pub quality: QualityTier,

    /// Whether downloads go into a per-creator folder.
    #[serde(default = "default_true", alias = "autoCreateFolder")]
    pub auto_create_folder: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            quality: QualityTier::Full,
            auto_create_folder: true,
        }
    }
}

/// Download executor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Base directory for downloads.
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Pause between consecutive transfers.
    #[serde(default = "default_cool_down_ms")]
    pub cool_down_ms: u64,

    /// Timeout for a single transfer.
    #[serde(default = "default_download_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            directory: None,
            cool_down_ms: default_cool_down_ms(),
            timeout_seconds: default_download_timeout_seconds(),
        }
    }
}

/// Correlation store bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of fingerprints (and of posts) kept.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Entries older than this are treated as absent.
    #[serde(default)]
    pub ttl_seconds: Option<u64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            ttl_seconds: None,
        }
    }
}

/// Request interception configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterceptConfig {
    /// Headers never replayed on a refetch.
    #[serde(default = "default_header_denylist")]
    pub header_denylist: Vec<String>,

    /// Timeout for a single refetch.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for InterceptConfig {
    fn default() -> Self {
        Self {
            header_denylist: default_header_denylist(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cool_down_ms() -> u64 {
    100
}

fn default_download_timeout_seconds() -> u64 {
    600
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_header_denylist() -> Vec<String> {
    DEFAULT_HEADER_DENYLIST.iter().map(|h| h.to_string()).collect()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Config(format!(
                    "Configuration file not found: {}",
                    path.display()
                ))
            } else {
                Error::Io(e)
            }
        })?;

        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the effective download directory.
    pub fn download_directory(&self) -> PathBuf {
        self.download
            .directory
            .clone()
            .unwrap_or_else(crate::fs::default_download_dir)
    }

    pub fn cool_down(&self) -> Duration {
        Duration::from_millis(self.download.cool_down_ms)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download.timeout_seconds)
    }

    pub fn store_ttl(&self) -> Option<Duration> {
        self.store.ttl_seconds.map(Duration::from_secs)
    }

    pub fn intercept_timeout(&self) -> Duration {
        Duration::from_secs(self.intercept.timeout_seconds)
    }
}
