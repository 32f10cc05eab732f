use std::sync::Arc;

use async_trait::async_trait;

use crate::schema::ConfigDocument;
use crate::storage_traits::{validate_repository_key, ConfigStore, StorageResult};
use crate::{CloudConfig, SurrealHandle};

/// SurrealDB-backed implementation of the ConfigStore trait.
#[derive(Clone)]
pub struct SurrealConfigStore {
    handle: Arc<SurrealHandle>,
}

impl SurrealConfigStore {
    pub fn new(handle: Arc<SurrealHandle>) -> Self {
        Self { handle }
    }

    /// Connect with [`SurrealHandle::setup`].
    pub async fn connect(cloud: Option<CloudConfig>, url: Option<&str>) -> StorageResult<Self> {
        let handle = SurrealHandle::setup(cloud, url).await?;
        Ok(Self::new(Arc::new(handle)))
    }

    /// Connect with [`SurrealHandle::setup_from_env`].
    pub async fn from_env() -> StorageResult<Self> {
        let handle = SurrealHandle::setup_from_env().await?;
        Ok(Self::new(Arc::new(handle)))
    }
}

#[async_trait]
impl ConfigStore for SurrealConfigStore {
    async fn get(&self, repository: &str) -> StorageResult<Option<ConfigDocument>> {
        self.handle.load_config(repository).await
    }

    async fn put(
        &self,
        repository: &str,
        document: serde_json::Value,
    ) -> StorageResult<ConfigDocument> {
        validate_repository_key(repository)?;
        let doc = ConfigDocument::new(repository, document);
        self.handle.save_config(&doc).await?;
        Ok(doc)
    }

    async fn delete(&self, repository: &str) -> StorageResult<bool> {
        self.handle.delete_config(repository).await
    }

    async fn list(&self) -> StorageResult<Vec<String>> {
        self.handle.list_configs().await
    }
}
