//! The session entity: one client's key-value bag, live for one request.
//!
//! Every operation that looks at the payload, read or write, ends the same
//! way: the expiration window slides to `now + timeout` and the whole
//! document is written to the store before the call returns. A read with
//! no payload change still writes, because the new expiry is itself a
//! change the store must see.
//!
//! Operations that fail before touching the payload (a missing key, a
//! reserved key) return without saving.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use docsession_store::{Payload, SessionDocument, SessionStore, expires_after};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{SessionError, id_tail};

/// Per-session timeout override, in seconds.
pub const TIMEOUT_KEY: &str = "_rs_timeout";

/// Where the anti-forgery token lives.
pub const CSRF_TOKEN_KEY: &str = "_csrft_";

/// Flash queues live under `_f_<queue name>`.
pub const FLASH_KEY_PREFIX: &str = "_f_";

/// Key namespaces reserved for internal use. Application writes to keys
/// starting with any of these fail with [`SessionError::ReservedKey`].
pub const RESERVED_KEY_PREFIXES: [&str; 3] = ["_rs_", CSRF_TOKEN_KEY, FLASH_KEY_PREFIX];

/// Registers the removal of the session cookie on the response.
pub(crate) type CookieDeleter = Box<dyn FnOnce() + Send + Sync>;

/// A live session.
///
/// Obtained from [`SessionFactory::session`](crate::SessionFactory::session)
/// and owned by a single request. Mutating and reading methods take
/// `&mut self` since they all update the expiry.
pub struct Session<S: SessionStore> {
    id: String,
    managed_dict: Payload,
    expires: DateTime<Utc>,
    default_timeout: u64,
    new: bool,
    invalidated: bool,
    store: Arc<S>,
    delete_cookie: Option<CookieDeleter>,
}

impl<S: SessionStore> Session<S> {
    /// Rebuilds a session from its stored document.
    pub fn from_document(document: SessionDocument, store: Arc<S>) -> Self {
        Self {
            id: document.session_id,
            managed_dict: document.managed_dict,
            expires: document.expires,
            default_timeout: document.default_timeout,
            new: false,
            invalidated: false,
            store,
            delete_cookie: None,
        }
    }

    /// Sets the side effect [`invalidate`](Self::invalidate) uses to remove
    /// the client's cookie.
    pub fn on_invalidate(mut self, delete_cookie: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.delete_cookie = Some(Box::new(delete_cookie));
        self
    }

    pub(crate) fn mark_new(mut self) -> Self {
        self.new = true;
        self
    }

    // -----------------------------------------------------------------------
    // Metadata (no refresh)
    // -----------------------------------------------------------------------

    /// The session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When the session goes stale.
    pub fn expires(&self) -> DateTime<Utc> {
        self.expires
    }

    /// Timeout applied when no per-session override is set.
    pub fn default_timeout(&self) -> u64 {
        self.default_timeout
    }

    /// The effective timeout: the `_rs_timeout` override if it holds a
    /// non-negative integer, the default timeout otherwise.
    pub fn timeout(&self) -> u64 {
        self.managed_dict
            .get(TIMEOUT_KEY)
            .and_then(Value::as_u64)
            .unwrap_or(self.default_timeout)
    }

    /// Returns `true` if the factory created this session during the
    /// current request.
    pub fn is_new(&self) -> bool {
        self.new
    }

    /// Returns `true` once [`invalidate`](Self::invalidate) succeeded.
    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    /// Number of payload entries.
    pub fn len(&self) -> usize {
        self.managed_dict.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managed_dict.is_empty()
    }

    /// The document as it would be persisted right now.
    pub fn to_document(&self) -> SessionDocument {
        SessionDocument {
            session_id: self.id.clone(),
            expires: self.expires,
            managed_dict: self.managed_dict.clone(),
            default_timeout: self.default_timeout,
        }
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    /// Writes the session to the store as-is, without sliding the expiry.
    pub async fn save(&self) -> Result<(), SessionError> {
        self.store.save(&self.to_document()).await?;
        tracing::debug!(session = id_tail(&self.id), "session saved");
        Ok(())
    }

    /// Slides the expiry and writes the session through.
    pub(crate) async fn touch_and_save(&mut self) -> Result<(), SessionError> {
        self.expires = expires_after(Utc::now(), self.timeout());
        self.save().await
    }

    pub(crate) fn ensure_live(&self) -> Result<(), SessionError> {
        if self.invalidated {
            return Err(SessionError::Invalidated);
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Mutating operations
    // -----------------------------------------------------------------------

    /// Stores `value` under `key`.
    ///
    /// # Errors
    /// [`SessionError::ReservedKey`] if `key` is in an internal namespace.
    pub async fn insert<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> Result<(), SessionError> {
        self.ensure_live()?;
        let key = key.into();
        check_key(&key)?;
        let value = serde_json::to_value(value)?;
        self.managed_dict.insert(key, value);
        self.touch_and_save().await
    }

    /// Removes `key` and returns its value.
    ///
    /// # Errors
    /// [`SessionError::MissingKey`] if `key` isn't present.
    pub async fn remove(&mut self, key: &str) -> Result<Value, SessionError> {
        self.ensure_live()?;
        let value = self
            .managed_dict
            .shift_remove(key)
            .ok_or_else(|| SessionError::MissingKey(key.to_string()))?;
        self.touch_and_save().await?;
        Ok(value)
    }

    /// Returns the value under `key`, storing `default` first if the key is
    /// absent.
    pub async fn set_default<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        default: T,
    ) -> Result<Value, SessionError> {
        self.ensure_live()?;
        let key = key.into();
        check_key(&key)?;
        let default = serde_json::to_value(default)?;
        let value = self.managed_dict.entry(key).or_insert(default).clone();
        self.touch_and_save().await?;
        Ok(value)
    }

    /// Removes every entry.
    pub async fn clear(&mut self) -> Result<(), SessionError> {
        self.ensure_live()?;
        self.managed_dict.clear();
        self.touch_and_save().await
    }

    /// Removes `key` if present and returns its value.
    pub async fn pop(&mut self, key: &str) -> Result<Option<Value>, SessionError> {
        self.ensure_live()?;
        let value = self.managed_dict.shift_remove(key);
        self.touch_and_save().await?;
        Ok(value)
    }

    /// Inserts every pair from `entries`.
    ///
    /// Keys are checked up front; if any is reserved nothing is inserted.
    pub async fn update<I, K>(&mut self, entries: I) -> Result<(), SessionError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        self.ensure_live()?;
        let entries: Vec<(String, Value)> =
            entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        for (key, _) in &entries {
            check_key(key)?;
        }
        self.managed_dict.extend(entries);
        self.touch_and_save().await
    }

    /// Removes and returns the most recently inserted entry.
    pub async fn pop_item(&mut self) -> Result<Option<(String, Value)>, SessionError> {
        self.ensure_live()?;
        let item = self.managed_dict.pop();
        self.touch_and_save().await?;
        Ok(item)
    }

    /// Persists the session after an in-place change the session can't
    /// observe on its own.
    pub async fn changed(&mut self) -> Result<(), SessionError> {
        self.ensure_live()?;
        self.touch_and_save().await
    }

    // -----------------------------------------------------------------------
    // Read operations
    // -----------------------------------------------------------------------

    /// Returns the value under `key` deserialized as `T`.
    pub async fn get<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>, SessionError> {
        self.get_value(key)
            .await?
            .map(serde_json::from_value)
            .transpose()
            .map_err(SessionError::from)
    }

    /// Returns the raw value under `key`.
    pub async fn get_value(&mut self, key: &str) -> Result<Option<Value>, SessionError> {
        self.ensure_live()?;
        let value = self.managed_dict.get(key).cloned();
        self.touch_and_save().await?;
        Ok(value)
    }

    /// Returns the value under `key`.
    ///
    /// # Errors
    /// [`SessionError::MissingKey`] if `key` isn't present.
    pub async fn item(&mut self, key: &str) -> Result<Value, SessionError> {
        self.ensure_live()?;
        let value = self
            .managed_dict
            .get(key)
            .cloned()
            .ok_or_else(|| SessionError::MissingKey(key.to_string()))?;
        self.touch_and_save().await?;
        Ok(value)
    }

    /// Returns `true` if `key` is present.
    pub async fn contains_key(&mut self, key: &str) -> Result<bool, SessionError> {
        self.ensure_live()?;
        let present = self.managed_dict.contains_key(key);
        self.touch_and_save().await?;
        Ok(present)
    }

    /// All keys, in insertion order.
    pub async fn keys(&mut self) -> Result<Vec<String>, SessionError> {
        self.ensure_live()?;
        let keys = self.managed_dict.keys().cloned().collect();
        self.touch_and_save().await?;
        Ok(keys)
    }

    /// All values, in insertion order.
    pub async fn values(&mut self) -> Result<Vec<Value>, SessionError> {
        self.ensure_live()?;
        let values = self.managed_dict.values().cloned().collect();
        self.touch_and_save().await?;
        Ok(values)
    }

    /// All entries, in insertion order.
    pub async fn items(&mut self) -> Result<Vec<(String, Value)>, SessionError> {
        self.ensure_live()?;
        let items = self
            .managed_dict
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        self.touch_and_save().await?;
        Ok(items)
    }

    /// Iterates over a snapshot of the entries taken at call time.
    pub async fn iter(&mut self) -> Result<std::vec::IntoIter<(String, Value)>, SessionError> {
        Ok(self.items().await?.into_iter())
    }

    // -----------------------------------------------------------------------
    // Session operations
    // -----------------------------------------------------------------------

    /// Ends the session: empties the payload, deletes the stored document
    /// and removes the client's cookie.
    ///
    /// Any later access fails with [`SessionError::Invalidated`]. If the
    /// delete fails the session stays usable and `invalidate` may be retried.
    pub async fn invalidate(&mut self) -> Result<(), SessionError> {
        self.ensure_live()?;
        self.managed_dict.clear();
        self.store.delete(&self.id).await?;
        self.invalidated = true;
        if let Some(delete_cookie) = self.delete_cookie.take() {
            delete_cookie();
        }
        tracing::info!(session = id_tail(&self.id), "session invalidated");
        Ok(())
    }

    /// Sets the per-session timeout. The new expiry already uses it.
    pub async fn adjust_timeout_for_session(&mut self, secs: u64) -> Result<(), SessionError> {
        self.insert_internal(TIMEOUT_KEY, Value::from(secs)).await
    }

    /// Insert that skips the reserved-key guard.
    pub(crate) async fn insert_internal(
        &mut self,
        key: &str,
        value: Value,
    ) -> Result<(), SessionError> {
        self.ensure_live()?;
        self.managed_dict.insert(key.to_string(), value);
        self.touch_and_save().await
    }

    /// Mutable access to the payload for internal operations that save
    /// afterwards.
    pub(crate) fn payload_mut(&mut self) -> &mut Payload {
        &mut self.managed_dict
    }

    pub(crate) fn payload(&self) -> &Payload {
        &self.managed_dict
    }
}

impl<S: SessionStore> fmt::Debug for Session<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &id_tail(&self.id))
            .field("expires", &self.expires)
            .field("default_timeout", &self.default_timeout)
            .field("keys", &self.managed_dict.keys().collect::<Vec<_>>())
            .field("new", &self.new)
            .field("invalidated", &self.invalidated)
            .finish()
    }
}

fn check_key(key: &str) -> Result<(), SessionError> {
    if RESERVED_KEY_PREFIXES.iter().any(|prefix| key.starts_with(prefix)) {
        return Err(SessionError::ReservedKey(key.to_string()));
    }
    Ok(())
}
