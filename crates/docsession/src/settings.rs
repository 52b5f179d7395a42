//! Session settings from a flat key-value source.
//!
//! Web applications often keep their configuration as one flat map of
//! strings (an `.ini` section, environment-derived pairs, a deployment
//! manifest). Session keys live under a common prefix:
//!
//! ```text
//! docsession.secret = change-me
//! docsession.timeout = 600
//! docsession.cookie_secure = true
//! ```
//!
//! [`SessionSettings::from_settings`] picks out the prefixed keys, keeps the
//! last dot-separated segment of each as the option name, and lets the
//! `config` crate coerce the string values into a typed struct.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use docsession_cookie::CookieOptions;
use docsession_lifecycle::{
    ConfigError, DEFAULT_TIMEOUT_SECS, IdGenerator, RandomIdGenerator, SessionConfig,
};
use serde::Deserialize;

use crate::SettingsError;

/// Keys starting with this prefix are session settings.
pub const DEFAULT_SETTINGS_PREFIX: &str = "docsession.";

// ---------------------------------------------------------------------------
// SessionSettings
// ---------------------------------------------------------------------------

/// Typed session settings. Missing keys keep their defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Signs the session cookie. Parsing accepts a missing secret;
    /// [`to_config`](Self::to_config) rejects it.
    pub secret: Option<String>,
    /// Sliding-expiration window in seconds.
    pub timeout: u64,

    pub cookie_name: String,
    pub cookie_max_age: Option<u64>,
    pub cookie_path: String,
    pub cookie_domain: Option<String>,
    pub cookie_secure: bool,
    pub cookie_httponly: bool,
    pub cookie_on_exception: bool,

    /// Prefix for generated ids. Conflicts with `id_generator`.
    pub prefix: Option<String>,
    /// Name of a generator in the [`IdGeneratorRegistry`].
    pub id_generator: Option<String>,

    // Store connection.
    /// Full connection URL. Takes precedence over `host`, `port` and `db`.
    pub url: Option<String>,
    pub host: String,
    pub port: u16,
    pub db: i64,
    /// Seconds.
    pub socket_timeout: Option<f64>,
    pub namespace: Option<String>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        let cookie = CookieOptions::default();
        Self {
            secret: None,
            timeout: DEFAULT_TIMEOUT_SECS,
            cookie_name: cookie.name,
            cookie_max_age: cookie.max_age,
            cookie_path: cookie.path,
            cookie_domain: cookie.domain,
            cookie_secure: cookie.secure,
            cookie_httponly: cookie.httponly,
            cookie_on_exception: cookie.on_exception,
            prefix: None,
            id_generator: None,
            url: None,
            host: "localhost".to_string(),
            port: 6379,
            db: 0,
            socket_timeout: None,
            namespace: None,
        }
    }
}

impl SessionSettings {
    /// Parses the `docsession.`-prefixed entries of `settings`.
    ///
    /// # Errors
    /// [`SettingsError::Load`] if a value can't be coerced, e.g.
    /// `timeout = soon`.
    pub fn from_settings<I, K, V>(settings: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        Self::from_settings_with_prefix(settings, DEFAULT_SETTINGS_PREFIX)
    }

    /// Like [`from_settings`](Self::from_settings) with a custom key prefix.
    pub fn from_settings_with_prefix<I, K, V>(settings: I, prefix: &str) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut builder = config::Config::builder();
        for (key, value) in settings {
            let Some(rest) = key.as_ref().strip_prefix(prefix) else {
                continue;
            };
            let option = rest.rsplit('.').next().unwrap_or(rest);
            if option.is_empty() {
                continue;
            }
            builder = builder.set_override(option, value.into())?;
        }
        let settings: Self = builder.build()?.try_deserialize()?;
        tracing::debug!(
            timeout = settings.timeout,
            cookie_name = %settings.cookie_name,
            "session settings loaded"
        );
        Ok(settings)
    }

    /// The cookie attributes these settings describe.
    pub fn cookie_options(&self) -> CookieOptions {
        CookieOptions {
            name: self.cookie_name.clone(),
            max_age: self.cookie_max_age,
            path: self.cookie_path.clone(),
            domain: self.cookie_domain.clone(),
            secure: self.cookie_secure,
            httponly: self.cookie_httponly,
            on_exception: self.cookie_on_exception,
        }
    }

    /// Validates the settings and builds a [`SessionConfig`], resolving
    /// `id_generator` through `registry`.
    ///
    /// # Errors
    /// - [`ConfigError::MissingSecret`] if no secret is set
    /// - [`ConfigError::ConflictingIdGenerator`] if both `prefix` and
    ///   `id_generator` are set
    /// - [`SettingsError::UnknownIdGenerator`] if `id_generator` isn't
    ///   registered
    pub fn to_config(&self, registry: &IdGeneratorRegistry) -> Result<SessionConfig, SettingsError> {
        let secret = self.secret.clone().ok_or(ConfigError::MissingSecret)?;
        if self.prefix.is_some() && self.id_generator.is_some() {
            return Err(ConfigError::ConflictingIdGenerator.into());
        }

        let mut builder = SessionConfig::builder(secret)
            .timeout(self.timeout)
            .cookie(self.cookie_options());
        if let Some(prefix) = &self.prefix {
            builder = builder.prefix(prefix.clone());
        }
        if let Some(name) = &self.id_generator {
            let generator = registry
                .get(name)
                .ok_or_else(|| SettingsError::UnknownIdGenerator(name.clone()))?;
            builder = builder.shared_id_generator(generator);
        }
        Ok(builder.build()?)
    }

    /// Connection settings for the Redis store: `url` if set, otherwise
    /// built from `host`, `port` and `db`.
    #[cfg(feature = "redis")]
    pub fn redis_store_config(&self) -> docsession_store::RedisStoreConfig {
        use docsession_store::RedisStoreConfig;

        let mut config = match &self.url {
            Some(url) => RedisStoreConfig {
                url: url.clone(),
                ..RedisStoreConfig::default()
            },
            None => RedisStoreConfig::from_parts(&self.host, self.port, self.db),
        };
        config.namespace = self.namespace.clone();
        config.response_timeout = self
            .socket_timeout
            .and_then(|secs| std::time::Duration::try_from_secs_f64(secs).ok());
        config
    }
}

// ---------------------------------------------------------------------------
// IdGeneratorRegistry
// ---------------------------------------------------------------------------

/// Named id generators that settings can refer to by `id_generator`.
///
/// `"random"` is always registered.
#[derive(Clone)]
pub struct IdGeneratorRegistry {
    generators: HashMap<String, Arc<dyn IdGenerator>>,
}

impl IdGeneratorRegistry {
    /// A registry holding only the built-in `"random"` generator.
    pub fn new() -> Self {
        let mut registry = Self {
            generators: HashMap::new(),
        };
        registry.register("random", RandomIdGenerator);
        registry
    }

    /// Registers `generator` under `name`, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, generator: impl IdGenerator) -> &mut Self {
        self.generators.insert(name.into(), Arc::new(generator));
        self
    }

    /// The generator registered under `name`, shared with the registry.
    pub fn get(&self, name: &str) -> Option<Arc<dyn IdGenerator>> {
        self.generators.get(name).cloned()
    }
}

impl Default for IdGeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for IdGeneratorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.generators.keys().collect();
        names.sort();
        f.debug_struct("IdGeneratorRegistry")
            .field("generators", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_cookie_defaults() {
        let settings = SessionSettings::default();
        assert_eq!(settings.cookie_options(), CookieOptions::default());
        assert_eq!(settings.timeout, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn test_from_settings_uses_last_segment() {
        let settings = SessionSettings::from_settings([
            ("docsession.secret", "s"),
            ("docsession.store.namespace", "app"),
        ])
        .unwrap();
        assert_eq!(settings.namespace.as_deref(), Some("app"));
    }

    #[test]
    fn test_registry_has_random() {
        let registry = IdGeneratorRegistry::new();
        assert_eq!(registry.get("random").unwrap().generate().len(), 64);
        assert!(registry.get("nope").is_none());
    }

    #[cfg(feature = "redis")]
    #[test]
    fn test_redis_store_config_from_parts() {
        let settings = SessionSettings {
            host: "cache".into(),
            port: 6380,
            db: 2,
            socket_timeout: Some(1.5),
            namespace: Some("app".into()),
            ..SessionSettings::default()
        };
        let config = settings.redis_store_config();
        assert_eq!(config.url, "redis://cache:6380/2");
        assert_eq!(config.namespace.as_deref(), Some("app"));
        assert_eq!(
            config.response_timeout,
            Some(std::time::Duration::from_millis(1500))
        );
    }
}
