//! # Docsession
//!
//! Server-side web sessions: the client holds a signed cookie naming a
//! session id, the server keeps the session's key-value payload in a
//! document store. Every read or write slides the session's expiry forward
//! and writes the session back before returning.
//!
//! The workspace is split by concern:
//!
//! | crate | provides |
//! |---|---|
//! | `docsession-cookie` | cookie signing and `Set-Cookie` rendering |
//! | `docsession-store` | the `SessionStore` trait and its stores |
//! | `docsession-lifecycle` | ids, the `Session` entity, the `SessionFactory` |
//!
//! This crate re-exports all three, adds settings parsing and a single
//! error type.
//!
//! ## Quick Start
//!
//! ```rust
//! use docsession::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), DocsessionError> {
//! let config = SessionConfig::builder("change-me").timeout(600).build()?;
//! let factory = SessionFactory::new(config, MemoryStore::new());
//!
//! // Per request: hand the incoming Cookie header to a scope...
//! let scope = RequestScope::from_cookie_header("");
//! let mut session = factory.session(&scope).await?;
//! session.insert("user_id", 42).await?;
//!
//! // ...and once the handler is done, send the cookies it produced.
//! for header in scope.finish(false).header_values() {
//!     println!("Set-Cookie: {header}");
//! }
//! # Ok(())
//! # }
//! ```

mod error;
pub mod settings;

pub use error::{DocsessionError, SettingsError};
pub use settings::{IdGeneratorRegistry, SessionSettings};

pub use docsession_cookie as cookie;
pub use docsession_lifecycle as lifecycle;
pub use docsession_store as store;

/// Everything needed to wire sessions into a request handler.
pub mod prelude {
    pub use docsession_cookie::{CookieOptions, CookieSigner, HmacSigner, SetCookie};
    pub use docsession_lifecycle::{
        IdGenerator, RequestScope, ResponseCookies, Session, SessionConfig, SessionFactory,
    };
    pub use docsession_store::{MemoryStore, SessionDocument, SessionStore};
    #[cfg(feature = "redis")]
    pub use docsession_store::{RedisStore, RedisStoreConfig};

    pub use crate::{DocsessionError, IdGeneratorRegistry, SessionSettings};
}

/// Installs a `tracing` subscriber printing to stderr.
///
/// The filter comes from `RUST_LOG` and defaults to `info` for the
/// docsession crates. Calling it twice is harmless; the second call does
/// nothing.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "docsession=info,docsession_lifecycle=info,docsession_store=info".into()
    });
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
