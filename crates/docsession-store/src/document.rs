//! The persisted shape of a session.

use chrono::{DateTime, TimeDelta, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// The application-visible session payload: string keys, any JSON value,
/// in insertion order.
pub type Payload = IndexMap<String, serde_json::Value>;

/// One stored session.
///
/// | field | meaning |
/// |---|---|
/// | `session_id` | primary key, opaque token |
/// | `expires` | time after which an external reaper may drop the session |
/// | `managed_dict` | the payload |
/// | `default_timeout` | base sliding window in seconds |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDocument {
    pub session_id: String,
    pub expires: DateTime<Utc>,
    pub managed_dict: Payload,
    pub default_timeout: u64,
}

impl SessionDocument {
    /// A document with an empty payload expiring `default_timeout` seconds
    /// from `now`.
    pub fn new(session_id: impl Into<String>, default_timeout: u64, now: DateTime<Utc>) -> Self {
        Self {
            session_id: session_id.into(),
            expires: expires_after(now, default_timeout),
            managed_dict: Payload::new(),
            default_timeout,
        }
    }

    /// Returns `true` if the document is stale at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }

    /// Seconds left until `expires`, never less than zero.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u64 {
        u64::try_from((self.expires - now).num_seconds()).unwrap_or(0)
    }
}

/// `now + timeout_secs`, saturating at the largest representable time.
pub fn expires_after(now: DateTime<Utc>, timeout_secs: u64) -> DateTime<Utc> {
    let delta = i64::try_from(timeout_secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX);
    now.checked_add_signed(delta)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
