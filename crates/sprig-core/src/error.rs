//! Error types for sprig-core

use thiserror::Error;

/// Result type alias using sprig-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in sprig-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Local database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Remote transport failure (network, authorization, HTTP status)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Remote payload did not match the wire contract
    #[error("Malformed remote record: {0}")]
    MalformedRecord(String),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Self::Transport(error.to_string())
    }
}
