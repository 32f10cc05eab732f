//! Storage trait definitions
//!
//! `ConfigStore` is a keyed point-lookup store: one optional JSON
//! document per repository full name. Absence is a normal outcome,
//! never an error.
//!
//! All methods are async and backend-agnostic. In-memory fakes are
//! provided for testing via the `fakes` module.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::schema::ConfigDocument;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Keyed configuration store.
///
/// Guarantees:
/// - `get(key)` returns `Ok(None)` when nothing is stored under `key`.
/// - `put(key, doc)` replaces any previous document for `key`.
/// - Backend failures surface as `StorageError::Unavailable` or
///   `StorageError::Backend`, never as `Ok(None)`.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Look up the document stored for a repository.
    async fn get(&self, repository: &str) -> StorageResult<Option<ConfigDocument>>;

    /// Insert or replace the document for a repository.
    async fn put(
        &self,
        repository: &str,
        document: serde_json::Value,
    ) -> StorageResult<ConfigDocument>;

    /// Remove the document for a repository. Returns whether one existed.
    async fn delete(&self, repository: &str) -> StorageResult<bool>;

    /// All repository keys with a stored document, sorted.
    async fn list(&self) -> StorageResult<Vec<String>>;
}

/// Check that a key has the `owner/repo` shape.
pub fn validate_repository_key(repository: &str) -> StorageResult<()> {
    match repository.split_once('/') {
        Some((owner, name))
            if !owner.trim().is_empty() && !name.trim().is_empty() && !name.contains('/') =>
        {
            Ok(())
        }
        _ => Err(StorageError::InvalidKey(repository.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_key_shape() {
        assert!(validate_repository_key("acme/api").is_ok());
        assert!(validate_repository_key("acme").is_err());
        assert!(validate_repository_key("/api").is_err());
        assert!(validate_repository_key("acme/").is_err());
        assert!(validate_repository_key("acme/api/extra").is_err());
    }
}
