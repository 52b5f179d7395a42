//! Factory configuration.
//!
//! Captured once when the factory is built and shared read-only by every
//! request afterwards.

use std::fmt;
use std::sync::Arc;

use docsession_cookie::CookieOptions;

use crate::{ConfigError, IdGenerator, PrefixedIdGenerator, RandomIdGenerator};

/// Default sliding-expiration window: 20 minutes.
pub const DEFAULT_TIMEOUT_SECS: u64 = 1200;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Validated configuration for a [`SessionFactory`](crate::SessionFactory).
///
/// Build one with [`SessionConfig::builder`]:
///
/// ```rust
/// use docsession_lifecycle::SessionConfig;
///
/// let config = SessionConfig::builder("s3cret")
///     .timeout(600)
///     .cookie_name("sid")
///     .cookie_secure(true)
///     .build()
///     .expect("valid config");
/// assert_eq!(config.timeout(), 600);
/// ```
#[derive(Clone)]
pub struct SessionConfig {
    secret: String,
    timeout: u64,
    cookie: CookieOptions,
    id_generator: Arc<dyn IdGenerator>,
}

impl SessionConfig {
    /// Starts a builder. `secret` signs the session cookie and is required.
    pub fn builder(secret: impl Into<String>) -> SessionConfigBuilder {
        SessionConfigBuilder::new(secret)
    }

    /// The cookie signing secret.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Default session timeout in seconds.
    pub fn timeout(&self) -> u64 {
        self.timeout
    }

    /// Attributes of the session cookie.
    pub fn cookie(&self) -> &CookieOptions {
        &self.cookie
    }

    /// The generator used for new session ids.
    pub fn id_generator(&self) -> &dyn IdGenerator {
        self.id_generator.as_ref()
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("secret", &"<redacted>")
            .field("timeout", &self.timeout)
            .field("cookie", &self.cookie)
            .field("id_generator", &"<IdGenerator>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SessionConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for [`SessionConfig`]. Validation happens in [`build`](Self::build).
pub struct SessionConfigBuilder {
    secret: String,
    timeout: u64,
    cookie: CookieOptions,
    id_generator: Option<Arc<dyn IdGenerator>>,
    prefix: Option<String>,
}

impl SessionConfigBuilder {
    fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            timeout: DEFAULT_TIMEOUT_SECS,
            cookie: CookieOptions::default(),
            id_generator: None,
            prefix: None,
        }
    }

    /// Seconds of inactivity before a session goes stale.
    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout = secs;
        self
    }

    /// Replaces all cookie attributes at once.
    pub fn cookie(mut self, cookie: CookieOptions) -> Self {
        self.cookie = cookie;
        self
    }

    /// Name of the session cookie. Defaults to `session`.
    ///
    /// Two applications on the same host need different names, otherwise
    /// each one overwrites the other's cookie and both keep minting new
    /// sessions.
    pub fn cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie.name = name.into();
        self
    }

    /// `Max-Age` in seconds. `None` (the default) makes it a browser-session
    /// cookie that disappears when the browser closes.
    ///
    /// This only controls the cookie. The stored session still expires
    /// after [`timeout`](Self::timeout) seconds of inactivity.
    pub fn cookie_max_age(mut self, max_age: Option<u64>) -> Self {
        self.cookie.max_age = max_age;
        self
    }

    /// URL path the browser sends the cookie for. Defaults to `/`.
    pub fn cookie_path(mut self, path: impl Into<String>) -> Self {
        self.cookie.path = path.into();
        self
    }

    /// `Domain` attribute. `None` (the default) scopes the cookie to the
    /// exact host that set it.
    pub fn cookie_domain(mut self, domain: Option<String>) -> Self {
        self.cookie.domain = domain;
        self
    }

    /// Sets the `Secure` flag so browsers only send the cookie over HTTPS.
    /// Off by default so plain-HTTP development setups work.
    pub fn cookie_secure(mut self, secure: bool) -> Self {
        self.cookie.secure = secure;
        self
    }

    /// Sets the `HttpOnly` flag, hiding the cookie from page scripts.
    /// On by default.
    pub fn cookie_httponly(mut self, httponly: bool) -> Self {
        self.cookie.httponly = httponly;
        self
    }

    /// Whether to still set the cookie on responses rendered while handling
    /// an error.
    pub fn cookie_on_exception(mut self, on_exception: bool) -> Self {
        self.cookie.on_exception = on_exception;
        self
    }

    /// Uses a custom id generator. Conflicts with [`prefix`](Self::prefix).
    pub fn id_generator(self, generator: impl IdGenerator) -> Self {
        self.shared_id_generator(Arc::new(generator))
    }

    /// Like [`id_generator`](Self::id_generator) for an already shared generator.
    pub fn shared_id_generator(mut self, generator: Arc<dyn IdGenerator>) -> Self {
        self.id_generator = Some(generator);
        self
    }

    /// Prefixes generated ids with `prefix` (see [`PrefixedIdGenerator`]).
    /// Conflicts with [`id_generator`](Self::id_generator).
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Validates and builds the configuration.
    ///
    /// # Errors
    /// - [`ConfigError::MissingSecret`]: the secret is empty
    /// - [`ConfigError::ConflictingIdGenerator`]: both a custom generator
    ///   and a prefix were set
    pub fn build(self) -> Result<SessionConfig, ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }
        let id_generator: Arc<dyn IdGenerator> = match (self.id_generator, self.prefix) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingIdGenerator),
            (Some(generator), None) => generator,
            (None, Some(prefix)) => Arc::new(PrefixedIdGenerator::new(prefix)),
            (None, None) => Arc::new(RandomIdGenerator),
        };
        Ok(SessionConfig {
            secret: self.secret,
            timeout: self.timeout,
            cookie: self.cookie,
            id_generator,
        })
    }
}
