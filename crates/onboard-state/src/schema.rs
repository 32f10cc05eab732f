//! Record shapes persisted by the configuration store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One stored configuration document, keyed by repository full name.
///
/// The document is kept as raw JSON; interpreting it is the caller's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigDocument {
    /// Repository full name (`owner/repo`)
    pub repository: String,
    /// Configuration document as stored
    pub document: serde_json::Value,
    /// Last write time
    pub updated_at: DateTime<Utc>,
}

impl ConfigDocument {
    /// Create a document stamped with the current time
    pub fn new(repository: impl Into<String>, document: serde_json::Value) -> Self {
        Self {
            repository: repository.into(),
            document,
            updated_at: Utc::now(),
        }
    }
}
