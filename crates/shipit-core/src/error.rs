//! Unified error types for shipit

use thiserror::Error;

/// Unified error type for all shipit operations
#[derive(Error, Debug)]
pub enum ShipError {
    // Git errors
    #[error("Git error ({command}): {stderr}")]
    GitCommand { command: String, stderr: String },

    #[error("Failed to start process: {0}")]
    Spawn(String),

    #[error("Repository error: {0}")]
    Repository(String),

    // Apps API errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("HTTP {status} from {url}: {body}")]
    HttpStatus {
        url: String,
        status: u16,
        body: String,
    },

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    // Generic
    #[error("{0}")]
    Other(String),
}

/// Result type alias using ShipError
pub type Result<T> = std::result::Result<T, ShipError>;
