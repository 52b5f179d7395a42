//! Integration tests for settings parsing and the settings → factory path.

use docsession::lifecycle::ConfigError;
use docsession::prelude::*;
use docsession::{SettingsError, settings::DEFAULT_SETTINGS_PREFIX};

fn settings(pairs: &[(&str, &str)]) -> Result<SessionSettings, SettingsError> {
    SessionSettings::from_settings(pairs.iter().copied())
}

// =========================================================================
// Parsing and coercion
// =========================================================================

#[test]
fn test_from_settings_coerces_types() {
    let parsed = settings(&[
        ("docsession.secret", "s3cret"),
        ("docsession.timeout", "600"),
        ("docsession.cookie_name", "sid"),
        ("docsession.cookie_max_age", "3600"),
        ("docsession.cookie_secure", "true"),
        ("docsession.cookie_httponly", "false"),
        ("docsession.cookie_on_exception", "false"),
        ("docsession.port", "6380"),
        ("docsession.db", "3"),
        ("docsession.socket_timeout", "2.5"),
    ])
    .unwrap();

    assert_eq!(parsed.secret.as_deref(), Some("s3cret"));
    assert_eq!(parsed.timeout, 600);
    assert_eq!(parsed.cookie_name, "sid");
    assert_eq!(parsed.cookie_max_age, Some(3600));
    assert!(parsed.cookie_secure);
    assert!(!parsed.cookie_httponly);
    assert!(!parsed.cookie_on_exception);
    assert_eq!(parsed.port, 6380);
    assert_eq!(parsed.db, 3);
    assert_eq!(parsed.socket_timeout, Some(2.5));
}

#[test]
fn test_from_settings_ignores_foreign_keys() {
    let parsed = settings(&[
        ("docsession.secret", "s3cret"),
        ("other.timeout", "5"),
        ("timeout", "7"),
    ])
    .unwrap();
    assert_eq!(parsed.timeout, 1200);
}

#[test]
fn test_from_settings_missing_keys_keep_defaults() {
    let parsed = settings(&[]).unwrap();
    assert_eq!(parsed, SessionSettings::default());
    assert_eq!(parsed.cookie_path, "/");
    assert!(parsed.cookie_httponly);
}

#[test]
fn test_from_settings_bad_integer_returns_load_error() {
    let result = settings(&[("docsession.timeout", "soon")]);
    assert!(matches!(result, Err(SettingsError::Load(_))));
}

#[test]
fn test_from_settings_with_custom_prefix() {
    let parsed = SessionSettings::from_settings_with_prefix(
        [("sessions.secret", "s"), ("docsession.secret", "ignored")],
        "sessions.",
    )
    .unwrap();
    assert_eq!(parsed.secret.as_deref(), Some("s"));
    assert_eq!(DEFAULT_SETTINGS_PREFIX, "docsession.");
}

// =========================================================================
// to_config()
// =========================================================================

#[test]
fn test_to_config_missing_secret_returns_error() {
    let parsed = settings(&[("docsession.timeout", "60")]).unwrap();
    let result = parsed.to_config(&IdGeneratorRegistry::new());
    assert!(matches!(
        result,
        Err(SettingsError::Config(ConfigError::MissingSecret))
    ));
}

#[test]
fn test_to_config_prefix_with_generator_returns_conflict() {
    let parsed = settings(&[
        ("docsession.secret", "s"),
        ("docsession.prefix", "app:"),
        ("docsession.id_generator", "random"),
    ])
    .unwrap();
    let result = parsed.to_config(&IdGeneratorRegistry::new());
    assert!(matches!(
        result,
        Err(SettingsError::Config(ConfigError::ConflictingIdGenerator))
    ));
}

#[test]
fn test_to_config_unknown_generator_returns_error() {
    let parsed = settings(&[
        ("docsession.secret", "s"),
        ("docsession.id_generator", "snowflake"),
    ])
    .unwrap();
    let result = parsed.to_config(&IdGeneratorRegistry::new());
    assert!(matches!(
        result,
        Err(SettingsError::UnknownIdGenerator(name)) if name == "snowflake"
    ));
}

#[test]
fn test_to_config_resolves_registered_generator() {
    let parsed = settings(&[
        ("docsession.secret", "s"),
        ("docsession.id_generator", "fixed"),
    ])
    .unwrap();
    let mut registry = IdGeneratorRegistry::new();
    registry.register("fixed", || "fixed-id".to_string());

    let config = parsed.to_config(&registry).unwrap();
    assert_eq!(config.id_generator().generate(), "fixed-id");
}

#[test]
fn test_to_config_prefix_applies_to_ids() {
    let parsed = settings(&[("docsession.secret", "s"), ("docsession.prefix", "app:")]).unwrap();
    let config = parsed.to_config(&IdGeneratorRegistry::new()).unwrap();
    assert!(config.id_generator().generate().starts_with("app:"));
}

#[tokio::test]
async fn test_settings_drive_factory_cookie() {
    let parsed = settings(&[
        ("docsession.secret", "s3cret"),
        ("docsession.cookie_name", "sid"),
        ("docsession.cookie_path", "/shop"),
    ])
    .unwrap();
    let config = parsed.to_config(&IdGeneratorRegistry::new()).unwrap();
    let factory = SessionFactory::new(config, MemoryStore::new());

    let scope = RequestScope::new();
    let session = factory.session(&scope).await.unwrap();
    let cookies = scope.finish(false).into_cookies();

    assert_eq!(cookies.len(), 1);
    assert_eq!(cookies[0].name(), "sid");
    assert!(cookies[0].header_value().contains("Path=/shop"));
    assert_eq!(
        HmacSigner.verify(cookies[0].value(), "s3cret").unwrap(),
        session.id()
    );
}
