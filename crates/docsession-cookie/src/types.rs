//! Cookie attributes and `Set-Cookie` rendering.

use cookie::Cookie;
use cookie::time::Duration;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CookieOptions
// ---------------------------------------------------------------------------

/// Attributes applied to every session cookie the factory emits.
///
/// `on_exception` isn't a cookie attribute: it decides whether the cookie
/// is written at all when the response is rendered while handling an
/// error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CookieOptions {
    /// Cookie name. Default: `session`.
    pub name: String,

    /// `Max-Age` in seconds. `None` yields a browser-session cookie.
    pub max_age: Option<u64>,

    /// Cookie path. Default: `/`.
    pub path: String,

    /// Cookie domain. `None` leaves the attribute out.
    pub domain: Option<String>,

    /// `Secure` flag. Default: `false`.
    pub secure: bool,

    /// `HttpOnly` flag. Default: `true`.
    pub httponly: bool,

    /// Whether to set the cookie on responses rendered during error
    /// handling. Default: `true`.
    pub on_exception: bool,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            name: "session".to_string(),
            max_age: None,
            path: "/".to_string(),
            domain: None,
            secure: false,
            httponly: true,
            on_exception: true,
        }
    }
}

impl CookieOptions {
    /// Builds the cookie carrying `value` with these attributes.
    pub fn set_cookie(&self, value: impl Into<String>) -> SetCookie {
        let mut builder = Cookie::build((self.name.clone(), value.into()))
            .path(self.path.clone())
            .secure(self.secure)
            .http_only(self.httponly);
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(max_age) = self.max_age {
            let secs = i64::try_from(max_age).unwrap_or(i64::MAX);
            builder = builder.max_age(Duration::seconds(secs));
        }
        SetCookie(builder.build())
    }

    /// Builds a cookie that tells the browser to drop the session cookie.
    ///
    /// Path and domain must match the original cookie for the browser to
    /// delete it, so they're carried over.
    pub fn removal_cookie(&self) -> SetCookie {
        let mut builder = Cookie::build((self.name.clone(), String::new()))
            .path(self.path.clone());
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        let mut cookie = builder.build();
        cookie.make_removal();
        SetCookie(cookie)
    }
}

// ---------------------------------------------------------------------------
// SetCookie
// ---------------------------------------------------------------------------

/// A cookie queued on a response.
#[derive(Debug, Clone, PartialEq)]
pub struct SetCookie(Cookie<'static>);

impl SetCookie {
    /// Cookie name.
    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// Cookie value (empty for removal cookies).
    pub fn value(&self) -> &str {
        self.0.value()
    }

    /// `Max-Age` in whole seconds, if set.
    pub fn max_age(&self) -> Option<i64> {
        self.0.max_age().map(|d| d.whole_seconds())
    }

    /// Returns `true` if this cookie deletes the client-side session.
    pub fn is_removal(&self) -> bool {
        self.0.value().is_empty() && self.max_age() == Some(0)
    }

    /// The full `Set-Cookie` header value.
    pub fn header_value(&self) -> String {
        self.0.to_string()
    }

    /// The underlying [`cookie::Cookie`].
    pub fn as_cookie(&self) -> &Cookie<'static> {
        &self.0
    }
}

impl std::fmt::Display for SetCookie {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Request side
// ---------------------------------------------------------------------------

/// Parses a `Cookie` request header into `(name, value)` pairs.
///
/// Pairs that fail to parse are skipped; a broken neighbour must not hide
/// the session cookie.
pub fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    Cookie::split_parse(header)
        .filter_map(|parsed| match parsed {
            Ok(c) => Some((c.name().to_string(), c.value().to_string())),
            Err(e) => {
                tracing::debug!(error = %e, "skipping unparseable cookie pair");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_options_default() {
        let options = CookieOptions::default();
        assert_eq!(options.name, "session");
        assert_eq!(options.path, "/");
        assert_eq!(options.max_age, None);
        assert!(options.httponly);
        assert!(!options.secure);
        assert!(options.on_exception);
    }

    #[test]
    fn test_set_cookie_applies_attributes() {
        let options = CookieOptions {
            name: "sid".into(),
            max_age: Some(3600),
            path: "/app".into(),
            domain: Some("example.com".into()),
            secure: true,
            httponly: true,
            on_exception: true,
        };
        let cookie = options.set_cookie("v.sig");
        assert_eq!(cookie.name(), "sid");
        assert_eq!(cookie.value(), "v.sig");
        assert_eq!(cookie.max_age(), Some(3600));
        assert!(!cookie.is_removal());

        let header = cookie.header_value();
        assert!(header.starts_with("sid=v.sig"));
        assert!(header.contains("Path=/app"));
        assert!(header.contains("Domain=example.com"));
        assert!(header.contains("Secure"));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains("Max-Age=3600"));
    }

    #[test]
    fn test_set_cookie_without_max_age_is_browser_scoped() {
        let cookie = CookieOptions::default().set_cookie("x");
        assert_eq!(cookie.max_age(), None);
        assert!(!cookie.header_value().contains("Max-Age"));
    }

    #[test]
    fn test_removal_cookie_is_removal() {
        let options = CookieOptions::default();
        let cookie = options.removal_cookie();
        assert_eq!(cookie.name(), "session");
        assert!(cookie.is_removal());
        assert!(cookie.header_value().contains("Max-Age=0"));
    }

    #[test]
    fn test_cookie_options_deserialize_partial() {
        let options: CookieOptions =
            serde_json::from_str(r#"{"name": "sid", "secure": true}"#).unwrap();
        assert_eq!(options.name, "sid");
        assert!(options.secure);
        assert_eq!(options.path, "/");
    }

    #[test]
    fn test_parse_cookie_header_multiple_pairs() {
        let pairs = parse_cookie_header("theme=dark; session=abc.def; lang=en");
        assert_eq!(pairs.len(), 3);
        assert!(pairs.contains(&("session".to_string(), "abc.def".to_string())));
    }

    #[test]
    fn test_parse_cookie_header_empty() {
        assert!(parse_cookie_header("").is_empty());
    }
}
