//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryConfigStore`, which satisfies the `ConfigStore`
//! contract without external dependencies, and `UnavailableConfigStore`,
//! which fails every call the way an unreachable backend would.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StorageError;
use crate::schema::ConfigDocument;
use crate::storage_traits::*;

// ---------------------------------------------------------------------------
// MemoryConfigStore
// ---------------------------------------------------------------------------

/// In-memory configuration store backed by a `HashMap<repository, document>`.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    docs: Mutex<HashMap<String, ConfigDocument>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-seeded with documents.
    pub fn with_documents<I, K>(documents: I) -> Self
    where
        I: IntoIterator<Item = (K, serde_json::Value)>,
        K: Into<String>,
    {
        let docs = documents
            .into_iter()
            .map(|(key, value)| {
                let key = key.into();
                (key.clone(), ConfigDocument::new(key, value))
            })
            .collect();
        Self {
            docs: Mutex::new(docs),
        }
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get(&self, repository: &str) -> StorageResult<Option<ConfigDocument>> {
        let docs = self.docs.lock().unwrap();
        Ok(docs.get(repository).cloned())
    }

    async fn put(
        &self,
        repository: &str,
        document: serde_json::Value,
    ) -> StorageResult<ConfigDocument> {
        validate_repository_key(repository)?;
        let doc = ConfigDocument::new(repository, document);
        let mut docs = self.docs.lock().unwrap();
        docs.insert(repository.to_string(), doc.clone());
        Ok(doc)
    }

    async fn delete(&self, repository: &str) -> StorageResult<bool> {
        let mut docs = self.docs.lock().unwrap();
        Ok(docs.remove(repository).is_some())
    }

    async fn list(&self) -> StorageResult<Vec<String>> {
        let docs = self.docs.lock().unwrap();
        let mut keys: Vec<String> = docs.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

// ---------------------------------------------------------------------------
// UnavailableConfigStore
// ---------------------------------------------------------------------------

/// Store whose backend is never reachable.
#[derive(Debug, Clone)]
pub struct UnavailableConfigStore {
    reason: String,
}

impl UnavailableConfigStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn fail<T>(&self) -> StorageResult<T> {
        Err(StorageError::Unavailable(self.reason.clone()))
    }
}

impl Default for UnavailableConfigStore {
    fn default() -> Self {
        Self::new("connection refused")
    }
}

#[async_trait]
impl ConfigStore for UnavailableConfigStore {
    async fn get(&self, _repository: &str) -> StorageResult<Option<ConfigDocument>> {
        self.fail()
    }

    async fn put(
        &self,
        _repository: &str,
        _document: serde_json::Value,
    ) -> StorageResult<ConfigDocument> {
        self.fail()
    }

    async fn delete(&self, _repository: &str) -> StorageResult<bool> {
        self.fail()
    }

    async fn list(&self) -> StorageResult<Vec<String>> {
        self.fail()
    }
}
