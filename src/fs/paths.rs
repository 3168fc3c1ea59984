//! Path and directory management.

use std::path::{Component, Path, PathBuf};

use directories::{ProjectDirs, UserDirs};

use crate::error::{Error, Result};

const CONFIG_FILE: &str = "config.toml";

/// The user's download directory, falling back to the current directory.
pub fn default_download_dir() -> PathBuf {
    UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    ProjectDirs::from("com", "fansly-grabber", "fansly-grabber")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
}

/// Join a relative synthesized filename onto the download directory.
///
/// Only plain components are accepted so a name can never leave `base`.
pub fn resolve_target(base: &Path, filename: &str) -> Result<PathBuf> {
    let relative = Path::new(filename);
    if filename.is_empty()
        || relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(Error::InvalidFilename(format!(
            "Refusing to write outside the download directory: '{}'",
            filename
        )));
    }
    Ok(base.join(relative))
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_target() {
        let base = Path::new("/downloads");
        assert_eq!(
            resolve_target(base, "Bob/1.mp4").unwrap(),
            PathBuf::from("/downloads/Bob/1.mp4")
        );
        assert!(resolve_target(base, "../1.mp4").is_err());
        assert!(resolve_target(base, "/etc/passwd").is_err());
        assert!(resolve_target(base, "").is_err());
    }

    #[test]
    fn test_ensure_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        ensure_dir(&nested).unwrap();
    }

    #[test]
    fn test_default_config_path_is_toml() {
        assert!(default_config_path().ends_with(CONFIG_FILE));
    }
}
