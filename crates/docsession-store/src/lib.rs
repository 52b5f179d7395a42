//! Session persistence for Docsession.
//!
//! Provides the [`SessionStore`] trait that abstracts over document stores,
//! the [`SessionDocument`] shape every store persists, and the stores that
//! ship with the crate.
//!
//! The session layer only needs four operations from a store and relies on
//! each one being atomic for a single document: a save either lands in full
//! or not at all. Concurrent writers to the same id race; the last save wins.
//!
//! # Feature Flags
//!
//! - `redis`: [`RedisStore`] via the `redis` crate

mod document;
mod error;
mod memory;
#[cfg(feature = "redis")]
mod redis_store;

pub use document::{Payload, SessionDocument, expires_after};
pub use error::StoreError;
pub use memory::MemoryStore;
#[cfg(feature = "redis")]
pub use redis_store::{RedisStore, RedisStoreConfig};

use std::future::Future;

/// Persists session documents, keyed by `session_id`.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` because one store instance is shared by every
/// request the factory serves. The returned futures are `Send` so session
/// access can happen inside spawned tasks.
pub trait SessionStore: Send + Sync + 'static {
    /// Looks up the document for `session_id`.
    ///
    /// Returns `Ok(None)` if nothing is stored under that id.
    fn find(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<Option<SessionDocument>, StoreError>> + Send;

    /// Writes the full document, replacing whatever is stored under its id.
    fn save(
        &self,
        document: &SessionDocument,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Writes the document only if its id is not stored yet.
    ///
    /// # Errors
    /// Returns [`StoreError::DuplicateId`] if the id is taken.
    fn insert(
        &self,
        document: &SessionDocument,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Removes the document for `session_id`.
    ///
    /// Removing an id that isn't stored succeeds.
    fn delete(&self, session_id: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
}
