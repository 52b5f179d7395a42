//! Flash queues and the anti-forgery token.
//!
//! Both live in the session payload under reserved keys, so they get the
//! same write-through and sliding expiry as application data.

use docsession_store::SessionStore;
use serde::Serialize;
use serde_json::Value;

use crate::id::random_bytes;
use crate::session::{CSRF_TOKEN_KEY, FLASH_KEY_PREFIX};
use crate::{Session, SessionError, id_tail};

/// The queue [`Session::flash_default`] writes to.
pub const DEFAULT_FLASH_QUEUE: &str = "";

const CSRF_TOKEN_BYTES: usize = 20;

fn queue_key(queue: &str) -> String {
    format!("{FLASH_KEY_PREFIX}{queue}")
}

impl<S: SessionStore> Session<S> {
    // -----------------------------------------------------------------------
    // Flash messages
    // -----------------------------------------------------------------------

    /// Appends `message` to the flash queue `queue`.
    ///
    /// With `allow_duplicate` set to `false`, a message equal to one already
    /// queued is dropped. The session is saved either way.
    ///
    /// # Errors
    /// [`SessionError::InvalidFlashQueue`] if the queue key holds something
    /// other than a list.
    pub async fn flash<T: Serialize>(
        &mut self,
        message: T,
        queue: &str,
        allow_duplicate: bool,
    ) -> Result<(), SessionError> {
        self.ensure_live()?;
        let message = serde_json::to_value(message)?;
        let key = queue_key(queue);
        let entry = self
            .payload_mut()
            .entry(key)
            .or_insert_with(|| Value::Array(Vec::new()));
        let Value::Array(messages) = entry else {
            return Err(SessionError::InvalidFlashQueue(queue.to_string()));
        };
        if allow_duplicate || !messages.contains(&message) {
            messages.push(message);
        }
        self.changed().await
    }

    /// Appends `message` to the default queue, allowing duplicates.
    pub async fn flash_default<T: Serialize>(&mut self, message: T) -> Result<(), SessionError> {
        self.flash(message, DEFAULT_FLASH_QUEUE, true).await
    }

    /// Returns the messages in `queue` without removing them.
    pub async fn peek_flash(&mut self, queue: &str) -> Result<Vec<Value>, SessionError> {
        self.ensure_live()?;
        let messages = queue_messages(self.payload().get(&queue_key(queue)).cloned(), queue)?;
        self.touch_and_save().await?;
        Ok(messages)
    }

    /// Removes and returns the messages in `queue`.
    pub async fn pop_flash(&mut self, queue: &str) -> Result<Vec<Value>, SessionError> {
        self.ensure_live()?;
        let key = queue_key(queue);
        // Validate before removing so a bad queue stays untouched.
        let messages = queue_messages(self.payload().get(&key).cloned(), queue)?;
        self.payload_mut().shift_remove(&key);
        self.touch_and_save().await?;
        Ok(messages)
    }

    // -----------------------------------------------------------------------
    // CSRF token
    // -----------------------------------------------------------------------

    /// Generates a new anti-forgery token, stores it, and returns it.
    ///
    /// The token is 20 random bytes as 40 lowercase hex characters.
    pub async fn new_csrf_token(&mut self) -> Result<String, SessionError> {
        let token = hex::encode(random_bytes::<CSRF_TOKEN_BYTES>());
        self.insert_internal(CSRF_TOKEN_KEY, Value::String(token.clone()))
            .await?;
        tracing::debug!(session = id_tail(self.id()), "csrf token rotated");
        Ok(token)
    }

    /// Returns the stored anti-forgery token, generating one if there is
    /// none.
    pub async fn get_csrf_token(&mut self) -> Result<String, SessionError> {
        self.ensure_live()?;
        match self.payload().get(CSRF_TOKEN_KEY) {
            Some(Value::String(token)) => {
                let token = token.clone();
                self.touch_and_save().await?;
                Ok(token)
            }
            _ => self.new_csrf_token().await,
        }
    }
}

fn queue_messages(value: Option<Value>, queue: &str) -> Result<Vec<Value>, SessionError> {
    match value {
        None => Ok(Vec::new()),
        Some(Value::Array(messages)) => Ok(messages),
        Some(_) => Err(SessionError::InvalidFlashQueue(queue.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use docsession_store::{MemoryStore, SessionDocument};
    use serde_json::json;

    use super::*;

    async fn session() -> (Session<MemoryStore>, MemoryStore) {
        let store = MemoryStore::new();
        let doc = SessionDocument::new("flash-1", 60, Utc::now());
        store.save(&doc).await.unwrap();
        (Session::from_document(doc, Arc::new(store.clone())), store)
    }

    // =====================================================================
    // flash()
    // =====================================================================

    #[tokio::test]
    async fn test_flash_duplicate_disallowed_keeps_single_copy() {
        let (mut session, _) = session().await;
        session.flash("saved", "info", false).await.unwrap();
        session.flash("saved", "info", false).await.unwrap();
        assert_eq!(session.peek_flash("info").await.unwrap(), vec![json!("saved")]);
    }

    #[tokio::test]
    async fn test_flash_duplicate_allowed_keeps_both() {
        let (mut session, _) = session().await;
        session.flash_default("hi").await.unwrap();
        session.flash_default("hi").await.unwrap();
        assert_eq!(
            session.peek_flash(DEFAULT_FLASH_QUEUE).await.unwrap(),
            vec![json!("hi"), json!("hi")]
        );
    }

    #[tokio::test]
    async fn test_flash_persists_queue_under_prefixed_key() {
        let (mut session, store) = session().await;
        session.flash(json!({"level": 2}), "errors", true).await.unwrap();
        let doc = store.find("flash-1").await.unwrap().unwrap();
        assert_eq!(doc.managed_dict["_f_errors"], json!([{"level": 2}]));
    }

    #[tokio::test]
    async fn test_flash_onto_non_list_returns_error() {
        let (mut session, _) = session().await;
        session
            .insert_internal("_f_bad", json!("scalar"))
            .await
            .unwrap();
        let result = session.flash("x", "bad", true).await;
        assert!(matches!(result, Err(SessionError::InvalidFlashQueue(q)) if q == "bad"));
    }

    // =====================================================================
    // peek_flash() / pop_flash()
    // =====================================================================

    #[tokio::test]
    async fn test_peek_flash_missing_queue_returns_empty() {
        let (mut session, _) = session().await;
        assert!(session.peek_flash("nothing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pop_flash_drains_queue() {
        let (mut session, store) = session().await;
        session.flash("a", "q", true).await.unwrap();
        session.flash("b", "q", true).await.unwrap();

        assert_eq!(
            session.pop_flash("q").await.unwrap(),
            vec![json!("a"), json!("b")]
        );
        assert!(session.pop_flash("q").await.unwrap().is_empty());
        let doc = store.find("flash-1").await.unwrap().unwrap();
        assert!(!doc.managed_dict.contains_key("_f_q"));
    }

    #[tokio::test]
    async fn test_queues_are_independent() {
        let (mut session, _) = session().await;
        session.flash("one", "a", true).await.unwrap();
        session.flash("two", "b", true).await.unwrap();
        assert_eq!(session.pop_flash("a").await.unwrap(), vec![json!("one")]);
        assert_eq!(session.peek_flash("b").await.unwrap(), vec![json!("two")]);
    }

    // =====================================================================
    // CSRF token
    // =====================================================================

    #[tokio::test]
    async fn test_new_csrf_token_is_40_hex_and_stored() {
        let (mut session, store) = session().await;
        let token = session.new_csrf_token().await.unwrap();
        assert_eq!(token.len(), 40);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        let doc = store.find("flash-1").await.unwrap().unwrap();
        assert_eq!(doc.managed_dict[CSRF_TOKEN_KEY], json!(token));
    }

    #[tokio::test]
    async fn test_get_csrf_token_is_stable_until_rotated() {
        let (mut session, _) = session().await;
        let first = session.get_csrf_token().await.unwrap();
        assert_eq!(session.get_csrf_token().await.unwrap(), first);
        let rotated = session.new_csrf_token().await.unwrap();
        assert_ne!(rotated, first);
        assert_eq!(session.get_csrf_token().await.unwrap(), rotated);
    }
}
