/// Errors that can occur in the store layer.
///
/// The session layer never retries on these (the one exception being
/// [`StoreError::DuplicateId`] during session creation); they surface to
/// whoever triggered the read or write.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique insert hit an id that's already stored.
    #[error("session id already in use")]
    DuplicateId(String),

    /// The document couldn't be converted to or from its stored form.
    #[error("session document serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend failed (connectivity, constraint violation, ...).
    #[error("store backend failure: {0}")]
    Backend(String),

    /// The Redis backend reported an error.
    #[cfg(feature = "redis")]
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}
