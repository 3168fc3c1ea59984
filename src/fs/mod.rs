//! Filesystem module.
//!
//! Provides:
//! - Default directories and safe target paths
//! - Filename synthesis and sanitization

pub mod naming;
pub mod paths;

pub use naming::{
    make_unique_filename, mime_to_extension, placeholder_filename, sanitize_creator,
    sanitize_filename, synthesize_filename,
};
pub use paths::{default_config_path, default_download_dir, ensure_dir, resolve_target};
