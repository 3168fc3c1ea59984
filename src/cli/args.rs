//! Command-line argument definitions using clap.

use clap::Parser;
use std::path::PathBuf;

use crate::config::Config;
use crate::media::QualityTier;

/// Host bridge for the Fansly media grabber.
#[derive(Parser, Debug, Default)]
#[command(
    name = "fansly-grabber",
    version,
    about = "Resolve and download full-quality Fansly media",
    long_about = "Host side of the Fansly media grabber.\n\n\
                  Reads intercepted requests, download requests and settings changes as JSON \
                  lines on stdin and answers on stdout."
)]
pub struct Args {
    /// Path to configuration file.
    #[arg(short, long, env = "FANSLY_GRABBER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base directory for downloads.
    #[arg(short = 'd', long = "directory", env = "FANSLY_GRABBER_DIR")]
    pub download_directory: Option<PathBuf>,

    /// Preferred video quality (preview, 240, 720, full).
    #[arg(short, long, value_parser = parse_quality)]
    pub quality: Option<QualityTier>,

    /// Save files directly in the download directory instead of per-creator folders.
    #[arg(long)]
    pub no_folder: bool,

    /// Maximum number of fingerprints kept in the correlation store.
    #[arg(long)]
    pub store_capacity: Option<usize>,

    /// Expire correlation entries after this many seconds.
    #[arg(long)]
    pub store_ttl: Option<u64>,

    /// Milliseconds to wait between downloads.
    #[arg(long)]
    pub cool_down_ms: Option<u64>,

    /// Log downloads instead of performing them.
    #[arg(long)]
    pub dry_run: bool,

    /// Enable debug logging.
    #[arg(long)]
    pub debug: bool,
}

fn parse_quality(value: &str) -> Result<QualityTier, String> {
    value.parse()
}

impl Args {
    /// Merge CLI arguments into an existing config, overriding where specified.
    pub fn merge_into_config(&self, config: &mut Config) {
        if let Some(dir) = &self.download_directory {
            config.download.directory = Some(dir.clone());
        }

        if let Some(quality) = self.quality {
            config.settings.quality = quality;
        }

        // Boolean flags (only override if set to non-default)
        if self.no_folder {
            config.settings.auto_create_folder = false;
        }

        if let Some(capacity) = self.store_capacity {
            config.store.capacity = capacity;
        }

        if let Some(ttl) = self.store_ttl {
            config.store.ttl_seconds = Some(ttl);
        }

        if let Some(cool_down) = self.cool_down_ms {
            config.download.cool_down_ms = cool_down;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_merge() {
        let args = Args::try_parse_from([
            "fansly-grabber",
            "-q",
            "720p",
            "--no-folder",
            "--store-capacity",
            "10",
            "-d",
            "/tmp/out",
        ])
        .unwrap();

        let mut config = Config::default();
        args.merge_into_config(&mut config);
        assert_eq!(config.settings.quality, QualityTier::P720);
        assert!(!config.settings.auto_create_folder);
        assert_eq!(config.store.capacity, 10);
        assert_eq!(config.download.directory, Some(PathBuf::from("/tmp/out")));
        assert_eq!(config.download.cool_down_ms, 100);
    }

    #[test]
    fn test_invalid_quality_rejected() {
        assert!(Args::try_parse_from(["fansly-grabber", "-q", "4k"]).is_err());
    }

    #[test]
    fn test_no_args_leave_config_untouched() {
        let args = Args::try_parse_from(["fansly-grabber"]).unwrap();
        let mut config = Config::default();
        config.settings.auto_create_folder = true;
        args.merge_into_config(&mut config);
        assert!(config.settings.auto_create_folder);
        assert_eq!(config.settings.quality, QualityTier::Full);
    }
}
