//! Redis-backed document store using the `redis` crate.

use std::time::Duration;

use chrono::Utc;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, ExistenceCheck, SetExpiry, SetOptions, Value};
use serde::Deserialize;

use crate::{SessionDocument, SessionStore, StoreError};

/// Connection settings for [`RedisStore`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RedisStoreConfig {
    /// Connection URL, e.g. `redis://127.0.0.1:6379/0`.
    pub url: String,

    /// Optional key prefix. With `namespace = "myapp"` the document for
    /// session `abc` lives under `myapp:abc`.
    pub namespace: Option<String>,

    /// Per-command response timeout.
    pub response_timeout: Option<Duration>,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/0".to_string(),
            namespace: None,
            response_timeout: None,
        }
    }
}

impl RedisStoreConfig {
    /// Builds the connection URL from its parts.
    pub fn from_parts(host: &str, port: u16, db: i64) -> Self {
        Self {
            url: format!("redis://{host}:{port}/{db}"),
            ..Self::default()
        }
    }
}

/// A [`SessionStore`] keeping one JSON document per Redis key.
///
/// Every write also sets the key's TTL to the time left until `expires`,
/// so Redis itself plays the role of the external reaper.
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
    config: RedisStoreConfig,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("connection", &"<ConnectionManager>")
            .field("config", &self.config)
            .finish()
    }
}

impl RedisStore {
    /// Wraps an existing connection.
    pub fn new(connection: ConnectionManager, config: RedisStoreConfig) -> Self {
        Self { connection, config }
    }

    /// Opens a managed connection to the server named in `config`.
    pub async fn connect(config: RedisStoreConfig) -> Result<Self, StoreError> {
        let client = redis::Client::open(config.url.as_str())?;
        let mut manager_config = ConnectionManagerConfig::new();
        if let Some(timeout) = config.response_timeout {
            manager_config = manager_config.set_response_timeout(timeout);
        }
        let connection = ConnectionManager::new_with_config(client, manager_config).await?;
        tracing::info!(url = %config.url, "connected to redis session store");
        Ok(Self { connection, config })
    }

    fn key(&self, session_id: &str) -> String {
        match &self.config.namespace {
            Some(namespace) => format!("{namespace}:{session_id}"),
            None => session_id.to_string(),
        }
    }
}

/// Redis rejects a zero TTL, and an already stale document still has to be
/// written for the caller to observe it.
fn ttl_secs(document: &SessionDocument) -> u64 {
    document.remaining_secs(Utc::now()).max(1)
}

impl SessionStore for RedisStore {
    async fn find(&self, session_id: &str) -> Result<Option<SessionDocument>, StoreError> {
        let raw: Option<Vec<u8>> = self.connection.clone().get(self.key(session_id)).await?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_slice(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, document: &SessionDocument) -> Result<(), StoreError> {
        let raw = serde_json::to_vec(document)?;
        let () = self
            .connection
            .clone()
            .set_ex(self.key(&document.session_id), raw, ttl_secs(document))
            .await?;
        Ok(())
    }

    async fn insert(&self, document: &SessionDocument) -> Result<(), StoreError> {
        let raw = serde_json::to_vec(document)?;
        let reply: Value = self
            .connection
            .clone()
            .set_options(
                self.key(&document.session_id),
                raw,
                SetOptions::default()
                    .conditional_set(ExistenceCheck::NX)
                    .with_expiration(SetExpiry::EX(ttl_secs(document))),
            )
            .await?;
        match reply {
            Value::Okay => Ok(()),
            Value::Nil => Err(StoreError::DuplicateId(document.session_id.clone())),
            other => Err(StoreError::Backend(format!(
                "redis SET replied with {other:?}, expected Okay or Nil"
            ))),
        }
    }

    async fn delete(&self, session_id: &str) -> Result<(), StoreError> {
        let _deleted: u64 = self.connection.clone().del(self.key(session_id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_parts_builds_url() {
        let config = RedisStoreConfig::from_parts("cache.local", 6380, 2);
        assert_eq!(config.url, "redis://cache.local:6380/2");
        assert!(config.namespace.is_none());
    }

    #[test]
    fn test_ttl_secs_never_zero() {
        let stale = SessionDocument::new("abc", 0, Utc::now());
        assert_eq!(ttl_secs(&stale), 1);
    }
}
