use std::io;
use std::time::Duration;

/// Error type for deploy_relay operations
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to start command: {0}")]
    CommandSpawn(io::Error),

    #[error("{0}")]
    CommandFailed(String),

    #[error("command timed out after {0:?}")]
    CommandTimeout(Duration),

    #[error("Notification request failed: {0}")]
    NotifyTransport(reqwest::Error),

    #[error("Notification rejected with status {status}: {body}")]
    NotifyRejected { status: u16, body: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Helper type for Results that use RelayError
pub type Result<T> = std::result::Result<T, RelayError>;
