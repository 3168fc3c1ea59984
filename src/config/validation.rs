//! Configuration validation logic.

use crate::config::Config;
use crate::error::{Error, Result};
use regex::Regex;

/// Validate the entire configuration.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_capacity(config.store.capacity)?;
    validate_directory(config)?;
    validate_header_denylist(&config.intercept.header_denylist)?;

    if config.intercept.timeout_seconds == 0 {
        return Err(Error::ConfigValidation {
            field: "intercept.timeout_seconds".to_string(),
            message: "Timeout must be at least one second".to_string(),
        });
    }

    if config.download.timeout_seconds == 0 {
        return Err(Error::ConfigValidation {
            field: "download.timeout_seconds".to_string(),
            message: "Timeout must be at least one second".to_string(),
        });
    }

    Ok(())
}

/// The store must hold at least one entry.
pub fn validate_capacity(capacity: usize) -> Result<()> {
    if capacity == 0 {
        return Err(Error::ConfigValidation {
            field: "store.capacity".to_string(),
            message: "Capacity must be greater than zero".to_string(),
        });
    }
    Ok(())
}

/// The download directory must not point at an existing regular file.
pub fn validate_directory(config: &Config) -> Result<()> {
    let dir = config.download_directory();
    if dir.as_os_str().is_empty() {
        return Err(Error::ConfigValidation {
            field: "download.directory".to_string(),
            message: "Download directory is empty".to_string(),
        });
    }
    if dir.is_file() {
        return Err(Error::ConfigValidation {
            field: "download.directory".to_string(),
            message: format!("{} is a file, not a directory", dir.display()),
        });
    }
    Ok(())
}

/// Header names must be valid HTTP tokens.
pub fn validate_header_denylist<S: AsRef<str>>(headers: &[S]) -> Result<()> {
    let re = Regex::new(r"^[A-Za-z0-9!#$%&'*+.^_`|~-]+$").map_err(|e| Error::Config(e.to_string()))?;

    for header in headers {
        let header = header.as_ref();
        if !re.is_match(header) {
            return Err(Error::ConfigValidation {
                field: "intercept.header_denylist".to_string(),
                message: format!("'{}' is not a valid header name", header),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        let mut config = Config::default();
        config.download.directory = Some(PathBuf::from("/tmp/fansly-grabber-test"));
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = Config::default();
        config.store.capacity = 0;
        assert!(matches!(
            validate_config(&config),
            Err(Error::ConfigValidation { field, .. }) if field == "store.capacity"
        ));
    }

    #[test]
    fn test_directory_that_is_a_file_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.download.directory = Some(file.path().to_path_buf());
        assert!(validate_directory(&config).is_err());
    }

    #[test]
    fn test_header_denylist() {
        assert!(validate_header_denylist(&["sec-fetch-mode", "host"]).is_ok());
        assert!(validate_header_denylist(&["bad header"]).is_err());
        assert!(validate_header_denylist(&[""]).is_err());
    }
}
