//! Integration tests for `RedisStore` against a live server.
//!
//! Ignored by default. Start Redis on localhost:6379 and run:
//!
//! ```text
//! cargo test -p docsession-store --features redis -- --ignored
//! ```
#![cfg(feature = "redis")]

use std::time::Duration;

use chrono::{TimeDelta, Utc};
use docsession_store::{RedisStore, RedisStoreConfig, SessionDocument, SessionStore, StoreError};
use serde_json::json;

async fn create_test_store() -> RedisStore {
    // A fresh namespace per store keeps concurrent test runs apart.
    let namespace = format!(
        "docsession_test_{}_{}",
        std::process::id(),
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    );
    let config = RedisStoreConfig {
        url: "redis://127.0.0.1:6379/0".into(),
        namespace: Some(namespace),
        response_timeout: Some(Duration::from_secs(2)),
    };
    tokio::time::timeout(Duration::from_secs(2), RedisStore::connect(config))
        .await
        .expect("Redis didn't answer within 2 seconds. Is it running on localhost:6379?")
        .unwrap()
}

#[tokio::test]
#[ignore = "needs a Redis server on localhost:6379"]
async fn test_redis_store_lifecycle() {
    let store = create_test_store().await;
    let now = Utc::now();
    let mut doc = SessionDocument::new("abc", 1200, now);
    doc.managed_dict.insert("user".into(), json!({"name": "ada", "roles": ["admin"]}));

    assert!(store.find("abc").await.unwrap().is_none());

    store.insert(&doc).await.unwrap();
    assert_eq!(store.find("abc").await.unwrap(), Some(doc.clone()));

    doc.managed_dict.insert("count".into(), json!(2));
    doc.expires = now + TimeDelta::seconds(60);
    store.save(&doc).await.unwrap();
    let found = store.find("abc").await.unwrap().unwrap();
    assert_eq!(found, doc);

    store.delete("abc").await.unwrap();
    assert!(store.find("abc").await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "needs a Redis server on localhost:6379"]
async fn test_redis_store_insert_existing_id_returns_duplicate() {
    let store = create_test_store().await;
    let now = Utc::now();

    let mut original = SessionDocument::new("taken", 60, now);
    original.managed_dict.insert("owner".into(), json!("alice"));
    store.insert(&original).await.unwrap();

    let intruder = SessionDocument::new("taken", 60, now);
    let result = store.insert(&intruder).await;
    assert!(matches!(result, Err(StoreError::DuplicateId(id)) if id == "taken"));

    let stored = store.find("taken").await.unwrap().unwrap();
    assert_eq!(stored.managed_dict["owner"], json!("alice"));
}

#[tokio::test]
#[ignore = "needs a Redis server on localhost:6379"]
async fn test_redis_store_save_is_last_writer_wins() {
    let store = create_test_store().await;
    let now = Utc::now();

    let mut first = SessionDocument::new("shared", 60, now);
    let mut second = first.clone();
    first.managed_dict.insert("writer".into(), json!("first"));
    second.managed_dict.insert("writer".into(), json!("second"));

    store.save(&first).await.unwrap();
    store.save(&second).await.unwrap();

    let stored = store.find("shared").await.unwrap().unwrap();
    assert_eq!(stored.managed_dict["writer"], json!("second"));
}

#[tokio::test]
#[ignore = "needs a Redis server on localhost:6379"]
async fn test_redis_store_delete_missing_id_is_ok() {
    let store = create_test_store().await;
    store.delete("never-stored").await.unwrap();
}

#[tokio::test]
#[ignore = "needs a Redis server on localhost:6379"]
async fn test_redis_store_namespaces_are_isolated() {
    let first = create_test_store().await;
    let second = create_test_store().await;
    let doc = SessionDocument::new("same-id", 60, Utc::now());

    first.insert(&doc).await.unwrap();
    second.insert(&doc).await.unwrap();
    first.delete("same-id").await.unwrap();

    assert!(first.find("same-id").await.unwrap().is_none());
    assert!(second.find("same-id").await.unwrap().is_some());
}

#[tokio::test]
#[ignore = "needs a Redis server on localhost:6379"]
async fn test_redis_store_key_expires_with_document() {
    let store = create_test_store().await;
    let doc = SessionDocument::new("short-lived", 1, Utc::now());
    store.insert(&doc).await.unwrap();
    assert!(store.find("short-lived").await.unwrap().is_some());

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert!(store.find("short-lived").await.unwrap().is_none());
}
