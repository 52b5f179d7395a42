//! Unified error type for Docsession.

use docsession_cookie::CookieError;
use docsession_lifecycle::{ConfigError, SessionError};
use docsession_store::StoreError;

/// Errors from turning raw settings into a session configuration.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The settings parsed but describe an invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A value couldn't be coerced to the type its key requires.
    #[error("invalid session settings: {0}")]
    Load(#[from] config::ConfigError),

    /// `id_generator` names a generator that was never registered.
    #[error("unknown id generator {0:?}")]
    UnknownIdGenerator(String),
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impl,
/// so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum DocsessionError {
    /// Cookie signing or verification.
    #[error(transparent)]
    Cookie(#[from] CookieError),

    /// The document store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Session access or resolution.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Building a session configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Parsing settings.
    #[error(transparent)]
    Settings(#[from] SettingsError),
}
