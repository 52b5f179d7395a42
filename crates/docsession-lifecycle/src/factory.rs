//! The session factory: resolves a request's cookie into a live session.
//!
//! ## Lifecycle
//!
//! ```text
//! cookie ──verify──→ find(id) ──→ live document ──→ RESUME (save once)
//!    │                  │
//!    │ missing/bad      │ unknown or stale
//!    ▼                  ▼
//!  CREATE: generate id ──→ insert ──→ DuplicateId? retry
//!    │
//!    ▼
//!  Set-Cookie callback registered
//! ```
//!
//! A bad cookie is never an error for the caller: whoever tampers with the
//! cookie just gets a fresh, empty session.

use std::sync::Arc;

use chrono::Utc;
use docsession_cookie::{CookieOptions, CookieSigner, HmacSigner};
use docsession_store::{SessionDocument, SessionStore, StoreError};

use crate::{RequestScope, ResponseCallbacks, Session, SessionConfig, SessionError, id_tail};

/// How many fresh ids the factory tries before giving up on an insert
/// that keeps colliding.
pub const MAX_ID_ATTEMPTS: usize = 5;

/// Builds a [`Session`] for each request.
///
/// ## Type parameters
///
/// - `S: SessionStore` is where documents live. The factory holds it in an
///   `Arc` and hands a clone of that `Arc` to every session, so a session
///   can keep writing through after the request handler drops the factory.
/// - `C: CookieSigner` signs and verifies the cookie. It defaults to
///   [`HmacSigner`], so most code only ever names `SessionFactory<S>`.
///
/// Cloning is cheap: configuration, store and signer sit behind an `Arc`
/// and are shared by every clone. The factory is read-only after
/// construction and can be handed to as many tasks as needed.
///
/// ## Example
///
/// ```rust
/// use docsession_lifecycle::{RequestScope, SessionConfig, SessionFactory};
/// use docsession_store::MemoryStore;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let config = SessionConfig::builder("s3cret").build().unwrap();
/// let factory = SessionFactory::new(config, MemoryStore::new());
///
/// let scope = RequestScope::new();
/// let mut session = factory.session(&scope).await.unwrap();
/// session.insert("visits", 1).await.unwrap();
/// assert!(session.is_new());
///
/// let response = scope.finish(false);
/// assert_eq!(response.cookies().len(), 1);
/// # }
/// ```
pub struct SessionFactory<S: SessionStore, C: CookieSigner = HmacSigner> {
    inner: Arc<Inner<S, C>>,
}

struct Inner<S, C> {
    config: SessionConfig,
    store: Arc<S>,
    signer: C,
}

impl<S: SessionStore, C: CookieSigner> Clone for SessionFactory<S, C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: SessionStore> SessionFactory<S> {
    /// A factory signing cookies with [`HmacSigner`].
    pub fn new(config: SessionConfig, store: S) -> Self {
        Self::with_signer(config, store, HmacSigner)
    }
}

impl<S: SessionStore, C: CookieSigner> SessionFactory<S, C> {
    /// A factory using a custom cookie signer.
    pub fn with_signer(config: SessionConfig, store: S, signer: C) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                store: Arc::new(store),
                signer,
            }),
        }
    }

    /// The configuration every session from this factory shares: secret,
    /// default timeout, cookie attributes and id generator.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// The store sessions are read from and written to.
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Resolves the session for the request behind `scope`.
    ///
    /// Resumes the stored session named by a valid cookie and slides its
    /// expiry. Otherwise creates and stores a new session and registers a
    /// callback on `scope` that sets the cookie on the response.
    ///
    /// # Errors
    /// [`SessionError::Store`] if the store fails, including when
    /// [`MAX_ID_ATTEMPTS`] fresh ids in a row were already taken.
    pub async fn session(&self, scope: &RequestScope) -> Result<Session<S>, SessionError> {
        if let Some(session_id) = self.cookie_session_id(scope) {
            match self.inner.store.find(&session_id).await? {
                Some(document) if !document.is_expired_at(Utc::now()) => {
                    return self.resume(document, scope).await;
                }
                Some(_) => {
                    tracing::debug!(session = id_tail(&session_id), "stored session is stale");
                }
                None => {
                    tracing::debug!(session = id_tail(&session_id), "no stored session for cookie");
                }
            }
        }
        self.create(scope).await
    }

    /// The session id carried by the request's cookie, if it verifies.
    fn cookie_session_id(&self, scope: &RequestScope) -> Option<String> {
        let config = &self.inner.config;
        let value = scope.cookie(&config.cookie().name)?;
        match self.inner.signer.verify(value, config.secret()) {
            Ok(session_id) => Some(session_id),
            Err(e) => {
                tracing::debug!(error = %e, "session cookie rejected");
                None
            }
        }
    }

    async fn resume(
        &self,
        document: SessionDocument,
        scope: &RequestScope,
    ) -> Result<Session<S>, SessionError> {
        let mut session = Session::from_document(document, Arc::clone(&self.inner.store))
            .on_invalidate(cookie_deleter(
                scope.callbacks().clone(),
                self.inner.config.cookie().clone(),
            ));
        session.touch_and_save().await?;
        tracing::debug!(session = id_tail(session.id()), "session resumed");
        Ok(session)
    }

    async fn create(&self, scope: &RequestScope) -> Result<Session<S>, SessionError> {
        let document = self.insert_fresh_document().await?;
        let session_id = document.session_id.clone();

        let cookie_value = self
            .inner
            .signer
            .sign(&session_id, self.inner.config.secret());
        let options = self.inner.config.cookie().clone();
        let options_for_deleter = options.clone();
        scope.callbacks().add(move |response| {
            if response.is_exception() && !options.on_exception {
                return;
            }
            response.push(options.set_cookie(cookie_value));
        });

        tracing::info!(session = id_tail(&session_id), "session created");
        let deleter = cookie_deleter(scope.callbacks().clone(), options_for_deleter);
        Ok(Session::from_document(document, Arc::clone(&self.inner.store))
            .on_invalidate(deleter)
            .mark_new())
    }

    /// Stores an empty document under a fresh id, retrying on collisions.
    async fn insert_fresh_document(&self) -> Result<SessionDocument, SessionError> {
        let config = &self.inner.config;
        let mut attempt = 1;
        loop {
            let document = SessionDocument::new(
                config.id_generator().generate(),
                config.timeout(),
                Utc::now(),
            );
            match self.inner.store.insert(&document).await {
                Ok(()) => return Ok(document),
                Err(StoreError::DuplicateId(session_id)) if attempt < MAX_ID_ATTEMPTS => {
                    tracing::warn!(
                        session = id_tail(&session_id),
                        attempt,
                        "generated session id already taken, retrying"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// The side effect `invalidate` runs: queue a removal cookie on the
/// response.
fn cookie_deleter(
    callbacks: ResponseCallbacks,
    options: CookieOptions,
) -> impl FnOnce() + Send + Sync + 'static {
    move || callbacks.add(move |response| response.push(options.removal_cookie()))
}

impl<S: SessionStore, C: CookieSigner> std::fmt::Debug for SessionFactory<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFactory")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
