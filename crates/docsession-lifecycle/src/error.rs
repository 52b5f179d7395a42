//! Error types for the lifecycle layer.

use docsession_store::StoreError;

/// Errors returned by session access and resolution.
///
/// Cookie problems never show up here: a bad or missing cookie simply
/// leads to a new session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Reading or writing the session document failed. The in-memory
    /// session may already reflect the change that failed to persist.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An item access or delete named a key that isn't in the session.
    #[error("no session value under key {0:?}")]
    MissingKey(String),

    /// Application code tried to write a key in an internal namespace
    /// (`_rs_`, `_csrft_`, `_f_`).
    #[error("session key {0:?} is in a reserved namespace")]
    ReservedKey(String),

    /// The session was invalidated earlier in this request. Resolve a new
    /// one through the factory.
    #[error("session has been invalidated")]
    Invalidated,

    /// A value couldn't be converted to or from JSON.
    #[error("session value conversion failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A flash queue key holds something other than a list.
    #[error("flash queue {0:?} does not hold a list")]
    InvalidFlashQueue(String),
}

/// Errors detected while building a [`SessionConfig`](crate::SessionConfig).
///
/// These are fatal: the application must not start with them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// No signing secret was provided.
    #[error("a cookie signing secret is required")]
    MissingSecret,

    /// Both a custom id generator and an id prefix were provided.
    #[error("cannot specify a custom id generator and a key prefix")]
    ConflictingIdGenerator,
}
