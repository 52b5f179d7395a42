//! In-process document store.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{SessionDocument, SessionStore, StoreError};

/// A [`SessionStore`] keeping documents in a `HashMap` behind a lock.
///
/// Cloning the store clones the handle, not the data: every clone sees the
/// same documents. Useful for tests, demos, and single-process deployments
/// that accept losing sessions on restart.
///
/// Expired documents are left in place; lookups return them like any other
/// document and the session factory decides what to do with them.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Arc<RwLock<HashMap<String, SessionDocument>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    /// Returns `true` if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    /// Returns `true` if a document is stored under `session_id`.
    pub async fn contains(&self, session_id: &str) -> bool {
        self.documents.read().await.contains_key(session_id)
    }
}

impl SessionStore for MemoryStore {
    async fn find(&self, session_id: &str) -> Result<Option<SessionDocument>, StoreError> {
        Ok(self.documents.read().await.get(session_id).cloned())
    }

    async fn save(&self, document: &SessionDocument) -> Result<(), StoreError> {
        self.documents
            .write()
            .await
            .insert(document.session_id.clone(), document.clone());
        Ok(())
    }

    async fn insert(&self, document: &SessionDocument) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        if documents.contains_key(&document.session_id) {
            return Err(StoreError::DuplicateId(document.session_id.clone()));
        }
        documents.insert(document.session_id.clone(), document.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<(), StoreError> {
        self.documents.write().await.remove(session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    #[tokio::test]
    async fn test_insert_duplicate_id_returns_error() {
        let store = MemoryStore::new();
        let doc = SessionDocument::new("abc", 60, Utc::now());
        store.insert(&doc).await.unwrap();

        let result = store.insert(&doc).await;
        assert!(matches!(result, Err(StoreError::DuplicateId(id)) if id == "abc"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_clones_share_documents() {
        let store = MemoryStore::new();
        let other = store.clone();
        store
            .save(&SessionDocument::new("abc", 60, Utc::now()))
            .await
            .unwrap();
        assert!(other.contains("abc").await);
    }

    #[tokio::test]
    async fn test_delete_absent_id_succeeds() {
        let store = MemoryStore::new();
        assert!(store.delete("missing").await.is_ok());
        assert!(store.is_empty().await);
    }
}
