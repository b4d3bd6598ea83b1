//! Client error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("API error [{status}]: {message}")]
    Api { status: u16, message: String },

    #[error("An upload is already in progress")]
    UploadInProgress,

    #[error("Session has been closed")]
    SessionClosed,

    #[error("Voice input unavailable: {0}")]
    Voice(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] curavyom_config::ConfigError),
}

pub type Result<T> = std::result::Result<T, ClientError>;
