//! Configuration Resolver
//!
//! One point lookup per call against the keyed store. A missing record
//! resolves to `Ok(None)`; only a lookup that cannot complete is an
//! error. No caching and no retries at this layer.

use std::sync::Arc;

use onboard_state::{ConfigStore, StorageError};
use tracing::{debug, instrument, warn};

use crate::config::ConfigurationRecord;
use crate::error::ResolveError;

#[derive(Clone)]
pub struct ConfigResolver {
    store: Arc<dyn ConfigStore>,
    strict: bool,
}

impl ConfigResolver {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            store,
            strict: false,
        }
    }

    /// In strict mode undecodable documents and records missing required
    /// fields fail with `MalformedConfiguration` instead of degrading.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Resolve the configuration of `repository` (`owner/repo`, exact key).
    #[instrument(skip(self), fields(strict = self.strict))]
    pub async fn resolve(
        &self,
        repository: &str,
    ) -> Result<Option<ConfigurationRecord>, ResolveError> {
        let decoded = match self.store.get(repository).await {
            Ok(Some(stored)) => ConfigurationRecord::from_document(&stored.document),
            Ok(None) => {
                debug!("No configuration stored");
                return Ok(None);
            }
            Err(StorageError::Serialization(reason)) => Err(reason),
            Err(source) => {
                return Err(ResolveError::StoreUnavailable {
                    repository: repository.to_string(),
                    source,
                });
            }
        };

        let record = match decoded {
            Ok(record) => record,
            Err(reason) if self.strict => {
                return Err(ResolveError::MalformedConfiguration {
                    repository: repository.to_string(),
                    reason,
                });
            }
            Err(reason) => {
                warn!(reason = %reason, "Ignoring undecodable configuration");
                return Ok(None);
            }
        };

        if self.strict {
            let missing = record.validate();
            if !missing.is_empty() {
                return Err(ResolveError::MalformedConfiguration {
                    repository: repository.to_string(),
                    reason: format!("missing required fields: {}", missing.join(", ")),
                });
            }
        }

        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Technology;
    use onboard_state::fakes::{MemoryConfigStore, UnavailableConfigStore};
    use serde_json::json;

    fn full_document() -> serde_json::Value {
        json!({
            "technology": "maven",
            "runner": {"type": "hosted"},
            "triggers": {"workflow_dispatch": true},
            "notify": "teams",
            "docker": false,
            "deploy": "helm"
        })
    }

    fn resolver_with(docs: Vec<(&str, serde_json::Value)>) -> ConfigResolver {
        ConfigResolver::new(Arc::new(MemoryConfigStore::with_documents(docs)))
    }

    #[tokio::test]
    async fn test_missing_record_is_none() {
        let resolver = resolver_with(vec![]);
        assert!(resolver.resolve("acme/api").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_present_record_is_returned() {
        let resolver = resolver_with(vec![("acme/api", full_document())]);
        let record = resolver.resolve("acme/api").await.unwrap().unwrap();
        assert_eq!(record.technology, Some(Technology::Maven));
        assert_eq!(record.deploy.as_deref(), Some("helm"));
    }

    #[tokio::test]
    async fn test_store_failure_is_not_a_miss() {
        let resolver = ConfigResolver::new(Arc::new(UnavailableConfigStore::default()));
        let err = resolver.resolve("acme/api").await.unwrap_err();
        assert!(matches!(err, ResolveError::StoreUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_undecodable_document_lenient_vs_strict() {
        let docs = vec![("acme/api", json!("python"))];

        let lenient = resolver_with(docs.clone());
        assert!(lenient.resolve("acme/api").await.unwrap().is_none());

        let strict = resolver_with(docs).strict(true);
        let err = strict.resolve("acme/api").await.unwrap_err();
        assert!(matches!(err, ResolveError::MalformedConfiguration { .. }));
    }

    #[tokio::test]
    async fn test_partial_record_lenient_vs_strict() {
        let docs = vec![("acme/api", json!({"technology": "node"}))];

        let lenient = resolver_with(docs.clone());
        let record = lenient.resolve("acme/api").await.unwrap().unwrap();
        assert_eq!(record.technology, Some(Technology::Node));

        let strict = resolver_with(docs).strict(true);
        match strict.resolve("acme/api").await.unwrap_err() {
            ResolveError::MalformedConfiguration { reason, .. } => {
                assert!(reason.contains("runner"));
                assert!(reason.contains("deploy"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_strict_accepts_complete_record() {
        let resolver = resolver_with(vec![("acme/api", full_document())]).strict(true);
        assert!(resolver.resolve("acme/api").await.unwrap().is_some());
    }
}
