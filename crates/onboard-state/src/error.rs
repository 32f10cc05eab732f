//! Error types for onboard-state

use thiserror::Error;

/// Errors that can occur in the configuration store
#[derive(Error, Debug)]
pub enum StorageError {
    /// The store could not be reached or the connection failed
    #[error("configuration store unavailable: {0}")]
    Unavailable(String),

    /// The backend accepted the request but the query failed
    #[error("configuration store query failed: {0}")]
    Backend(String),

    /// A document could not be encoded or decoded
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Repository keys must be `owner/repo`
    #[error("invalid repository key: {0:?}")]
    InvalidKey(String),
}

impl StorageError {
    /// Whether the failure means the lookup itself could not complete.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StorageError::Unavailable(_) | StorageError::Backend(_))
    }
}

impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}
