//! Error types for the bug monitor
//!
//! This module provides comprehensive error handling using thiserror for
//! structured error definitions and anyhow for error propagation.

use thiserror::Error;

/// A notification that cannot be turned into a change event.
///
/// Callers log the sender/subject and skip the message; a malformed message
/// never aborts the rest of a batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedEventError {
    /// A required tracker header is absent
    #[error("missing required header {0}")]
    MissingHeader(String),

    /// The subject line carries no `[Bug N]` reference
    #[error("no bug id in subject: {0:?}")]
    MissingBugId(String),

    /// Neither a receive time nor a parsable Date header
    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),
}

/// Main error type for bug monitor operations
#[derive(Error, Debug)]
pub enum BugmonitorError {
    /// Notification could not be normalised
    #[error("Malformed event: {0}")]
    MalformedEvent(#[from] MalformedEventError),

    /// Tracker query or update failed
    #[error("Tracker error: {message}")]
    Tracker { message: String, retryable: bool },

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Spreadsheet import error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid operation (e.g., a contest window that ends before it starts)
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl BugmonitorError {
    /// Build a tracker error the caller may retry later
    pub fn tracker_retryable(message: impl Into<String>) -> Self {
        BugmonitorError::Tracker {
            message: message.into(),
            retryable: true,
        }
    }

    /// Whether repeating the same call may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            BugmonitorError::Tracker { retryable, .. } => *retryable,
            BugmonitorError::Http(e) => e.is_timeout() || e.is_connect(),
            BugmonitorError::Database(msg) => msg.contains("locked") || msg.contains("busy"),
            _ => false,
        }
    }
}

/// Result type alias for bug monitor operations
pub type Result<T> = std::result::Result<T, BugmonitorError>;

impl From<rusqlite::Error> for BugmonitorError {
    fn from(err: rusqlite::Error) -> Self {
        BugmonitorError::Database(err.to_string())
    }
}

impl From<deadpool_sqlite::PoolError> for BugmonitorError {
    fn from(err: deadpool_sqlite::PoolError) -> Self {
        BugmonitorError::Database(format!("Failed to get connection from pool: {}", err))
    }
}

impl From<deadpool_sqlite::InteractError> for BugmonitorError {
    fn from(err: deadpool_sqlite::InteractError) -> Self {
        BugmonitorError::Database(format!("Pool interaction failed: {}", err))
    }
}

/// Convert anyhow::Error to BugmonitorError
impl From<anyhow::Error> for BugmonitorError {
    fn from(err: anyhow::Error) -> Self {
        BugmonitorError::Other(err.to_string())
    }
}
