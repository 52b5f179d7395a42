//! Session lifecycle for Docsession.
//!
//! This crate turns a request's session cookie into a live [`Session`]:
//!
//! 1. **Identifiers**: minting unguessable session ids ([`IdGenerator`])
//! 2. **Resolution**: resuming the stored session named by the cookie, or
//!    creating a new one ([`SessionFactory`])
//! 3. **Access**: a key-value bag where every read or write slides the
//!    expiration window and is written through to the store ([`Session`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Request (cookies) → SessionFactory → Session ⇄ SessionStore
//!                          ↓
//!               ResponseCallbacks → Set-Cookie
//! ```
//!
//! Two requests carrying the same cookie each load their own copy of the
//! session. Nothing serializes them: the store keeps whichever save lands
//! last.

mod config;
mod error;
mod factory;
mod flash;
mod id;
mod scope;
mod session;

pub use config::{DEFAULT_TIMEOUT_SECS, SessionConfig, SessionConfigBuilder};
pub use error::{ConfigError, SessionError};
pub use factory::{MAX_ID_ATTEMPTS, SessionFactory};
pub use flash::DEFAULT_FLASH_QUEUE;
pub use id::{IdGenerator, PrefixedIdGenerator, RandomIdGenerator};
pub use scope::{RequestScope, ResponseCallbacks, ResponseCookies};
pub use session::{
    CSRF_TOKEN_KEY, FLASH_KEY_PREFIX, RESERVED_KEY_PREFIXES, Session, TIMEOUT_KEY,
};

/// Characters of a session id that [`id_tail`] keeps.
const ID_TAIL_CHARS: usize = 8;

/// The last few characters of a session id, enough to correlate log lines
/// without writing usable ids to the logs.
pub(crate) fn id_tail(id: &str) -> &str {
    match id.char_indices().rev().nth(ID_TAIL_CHARS - 1) {
        Some((start, _)) => &id[start..],
        None => id,
    }
}
