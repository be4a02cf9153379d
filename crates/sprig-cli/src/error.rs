use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] sprig_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("Not signed in. Run `sprig login` first.")]
    NotSignedIn,
    #[error(
        "Sync is not configured. Set SPRIG_BACKEND_URL and SPRIG_ANON_KEY (an .env file works too)."
    )]
    SyncNotConfigured,
    #[error("No {0} found. Nothing to show yet.")]
    NothingRecorded(&'static str),
}
