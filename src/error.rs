//! Error types for the fansly-grabber application.

use thiserror::Error;

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration value for '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // Interception errors
    #[error("Refetch failed: HTTP {status} for {url}")]
    RefetchStatus { status: u16, url: String },

    #[error("Unwatched endpoint: {0}")]
    UnwatchedEndpoint(String),

    // Payload errors
    #[error("Invalid payload: {0}")]
    Payload(String),

    // Download errors
    #[error("Download failed: {0}")]
    Download(String),

    #[error("Download queue is closed")]
    QueueClosed,

    // Page errors
    #[error("Page runtime has shut down")]
    PageClosed,

    // File system errors
    #[error("Invalid filename (path traversal attempt): {0}")]
    InvalidFilename(String),

    // Messaging errors
    #[error("Malformed message: {0}")]
    MalformedMessage(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // HTTP errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    // URL parsing errors
    #[error("Invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Process exit codes for the bridge binary.
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const CONFIG_ERROR: i32 = 3;
    pub const DOWNLOAD_ERROR: i32 = 4;
    pub const UNEXPECTED_ERROR: i32 = 5;
}
