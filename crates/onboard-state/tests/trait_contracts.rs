//! Trait contract tests for ConfigStore.
//!
//! These tests verify the behavioral contract of the store trait using
//! the in-memory fake and the SurrealDB in-memory engine. Any conforming
//! implementation must pass these.

use std::sync::Arc;

use onboard_state::fakes::{MemoryConfigStore, UnavailableConfigStore};
use onboard_state::{ConfigStore, StorageError, SurrealConfigStore, SurrealHandle};
use serde_json::json;

async fn surreal_store() -> SurrealConfigStore {
    let handle = Arc::new(SurrealHandle::setup_db().await.unwrap());
    SurrealConfigStore::new(handle)
}

async fn check_get_missing_is_none(store: &dyn ConfigStore) {
    let found = store.get("acme/missing").await.unwrap();
    assert!(found.is_none());
}

async fn check_put_then_get(store: &dyn ConfigStore) {
    let doc = json!({
        "technology": "python",
        "runner": {"type": "self-hosted", "labels": ["gpu"]},
        "docker": true
    });
    store.put("acme/api", doc.clone()).await.unwrap();

    let found = store.get("acme/api").await.unwrap().unwrap();
    assert_eq!(found.repository, "acme/api");
    assert_eq!(found.document, doc);
}

async fn check_put_replaces(store: &dyn ConfigStore) {
    store
        .put("acme/web", json!({"technology": "node"}))
        .await
        .unwrap();
    store
        .put("acme/web", json!({"technology": "maven"}))
        .await
        .unwrap();

    let found = store.get("acme/web").await.unwrap().unwrap();
    assert_eq!(found.document["technology"], "maven");
    assert_eq!(store.list().await.unwrap(), vec!["acme/web".to_string()]);
}

async fn check_key_is_exact(store: &dyn ConfigStore) {
    store
        .put("acme/api", json!({"technology": "node"}))
        .await
        .unwrap();

    assert!(store.get("ACME/API").await.unwrap().is_none());
    assert!(store.get("acme/api-v2").await.unwrap().is_none());
}

async fn check_delete(store: &dyn ConfigStore) {
    store
        .put("acme/api", json!({"technology": "node"}))
        .await
        .unwrap();

    assert!(store.delete("acme/api").await.unwrap());
    assert!(!store.delete("acme/api").await.unwrap());
    assert!(store.get("acme/api").await.unwrap().is_none());
}

async fn check_list_sorted(store: &dyn ConfigStore) {
    for key in ["zeta/one", "acme/two", "mid/three"] {
        store.put(key, json!({})).await.unwrap();
    }
    assert_eq!(
        store.list().await.unwrap(),
        vec!["acme/two", "mid/three", "zeta/one"]
    );
}

async fn check_put_rejects_bad_key(store: &dyn ConfigStore) {
    let err = store.put("not-a-repo", json!({})).await.unwrap_err();
    assert!(matches!(err, StorageError::InvalidKey(_)));
}

// ===========================================================================
// MemoryConfigStore
// ===========================================================================

#[tokio::test]
async fn memory_get_missing_is_none() {
    check_get_missing_is_none(&MemoryConfigStore::new()).await;
}

#[tokio::test]
async fn memory_put_then_get() {
    check_put_then_get(&MemoryConfigStore::new()).await;
}

#[tokio::test]
async fn memory_put_replaces() {
    check_put_replaces(&MemoryConfigStore::new()).await;
}

#[tokio::test]
async fn memory_key_is_exact() {
    check_key_is_exact(&MemoryConfigStore::new()).await;
}

#[tokio::test]
async fn memory_delete() {
    check_delete(&MemoryConfigStore::new()).await;
}

#[tokio::test]
async fn memory_list_sorted() {
    check_list_sorted(&MemoryConfigStore::new()).await;
}

#[tokio::test]
async fn memory_put_rejects_bad_key() {
    check_put_rejects_bad_key(&MemoryConfigStore::new()).await;
}

#[tokio::test]
async fn memory_seeded_documents_are_visible() {
    let store = MemoryConfigStore::with_documents([("acme/api", json!({"docker": true}))]);
    let found = store.get("acme/api").await.unwrap().unwrap();
    assert_eq!(found.document["docker"], true);
}

// ===========================================================================
// SurrealConfigStore (in-memory engine)
// ===========================================================================

#[tokio::test]
async fn surreal_get_missing_is_none() {
    check_get_missing_is_none(&surreal_store().await).await;
}

#[tokio::test]
async fn surreal_put_then_get() {
    check_put_then_get(&surreal_store().await).await;
}

#[tokio::test]
async fn surreal_put_replaces() {
    check_put_replaces(&surreal_store().await).await;
}

#[tokio::test]
async fn surreal_key_is_exact() {
    check_key_is_exact(&surreal_store().await).await;
}

#[tokio::test]
async fn surreal_delete() {
    check_delete(&surreal_store().await).await;
}

#[tokio::test]
async fn surreal_list_sorted() {
    check_list_sorted(&surreal_store().await).await;
}

#[tokio::test]
async fn surreal_put_rejects_bad_key() {
    check_put_rejects_bad_key(&surreal_store().await).await;
}

// ===========================================================================
// UnavailableConfigStore
// ===========================================================================

#[tokio::test]
async fn unavailable_store_fails_instead_of_returning_none() {
    let store = UnavailableConfigStore::default();
    let err = store.get("acme/api").await.unwrap_err();

    assert!(matches!(err, StorageError::Unavailable(_)));
    assert!(err.is_unavailable());
}
