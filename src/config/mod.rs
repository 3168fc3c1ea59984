//! Configuration module for fansly-grabber.
//!
//! This module handles:
//! - Loading configuration from TOML files
//! - Live settings updates
//! - Configuration validation

pub mod loader;
pub mod settings;
pub mod validation;

pub use loader::{Config, DownloadConfig, InterceptConfig, Settings, StoreConfig};
pub use settings::{SettingsHandle, SettingsUpdate};
pub use validation::validate_config;
