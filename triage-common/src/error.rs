//! Common error types for triage modules

use thiserror::Error;

use crate::settings::ValidationError;

/// Common result type for triage operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across triage modules
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings document could not be parsed or written
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Bootstrap TOML could not be parsed
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or path resolution error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Settings rejected by validation
    #[error("Invalid settings: {0}")]
    Validation(#[from] ValidationError),
}
