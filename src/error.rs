//! Error types for the autoupdate service.

use crate::types::UserId;
use thiserror::Error;

/// Error type returned by external collaborators (data source, restricter,
/// key providers, user updaters).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for autoupdate operations.
#[derive(Debug, Error)]
pub enum AutoupdateError {
    #[error("get values for keys {keys:?} from datastore: {source}")]
    Fetch {
        keys: Vec<String>,
        #[source]
        source: BoxError,
    },

    #[error("restrict data for user {uid}: {source}")]
    Restrict {
        uid: UserId,
        #[source]
        source: BoxError,
    },

    #[error("build keys for user {uid}: {source}")]
    Keys {
        uid: UserId,
        #[source]
        source: BoxError,
    },

    #[error("getting additional user ids: {0}")]
    AdditionalUpdate(#[source] BoxError),

    #[error("topic id {since} is older than the earliest valid id {earliest}")]
    StaleId { since: u64, earliest: u64 },

    #[error("operation cancelled")]
    Cancelled,

    #[error("service closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl AutoupdateError {
    /// True if the error means "stop", not "failure": the caller cancelled or
    /// the service shut down.
    pub fn is_stop(&self) -> bool {
        matches!(self, AutoupdateError::Cancelled | AutoupdateError::Closed)
    }
}

impl From<serde_json::Error> for AutoupdateError {
    fn from(e: serde_json::Error) -> Self {
        AutoupdateError::Serialization(e.to_string())
    }
}

/// Result type for autoupdate operations.
pub type Result<T> = std::result::Result<T, AutoupdateError>;
