//! Signer trait and the default HMAC implementation.
//!
//! The session layer never looks inside a cookie value. It hands the raw
//! session id to a [`CookieSigner`] when writing the response, and asks the
//! same signer to give the id back when the next request comes in. Any
//! signer works as long as `verify(sign(token))` returns `token`.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::CookieError;

type HmacSha256 = Hmac<Sha256>;

/// Separates the token from its signature in the cookie value.
const SIGNATURE_SEPARATOR: char = '.';

/// Signs session tokens for the client and verifies them on the way back.
///
/// Implementations must be deterministic for a given `(token, secret)` pair
/// and must reject any value that wasn't produced by `sign` with the same
/// secret.
///
/// ## Trait bounds explained
///
/// - `Send + Sync`: one signer lives inside the session factory, and the
///   factory is shared by every request task the runtime schedules.
/// - `'static`: the signer owns everything it needs. The factory keeps it
///   for the whole life of the application.
///
/// The secret is passed on every call instead of stored in the signer, so
/// a stateless signer like [`HmacSigner`] is a zero-sized type.
pub trait CookieSigner: Send + Sync + 'static {
    /// Produces the cookie value for `token`.
    fn sign(&self, token: &str, secret: &str) -> String;

    /// Recovers the token from a cookie value.
    ///
    /// # Errors
    /// [`CookieError::InvalidSignature`] for any value `sign` didn't produce
    /// with this secret. A value with no separator or an undecodable
    /// signature is reported the same way as a mismatched one, so callers
    /// have a single rejection case.
    fn verify(&self, cookie_value: &str, secret: &str) -> Result<String, CookieError>;
}

// ---------------------------------------------------------------------------
// HmacSigner
// ---------------------------------------------------------------------------

/// A [`CookieSigner`] using HMAC-SHA256.
///
/// The cookie value is `<token>.<signature>` where the signature is the
/// unpadded URL-safe base64 encoding of `HMAC-SHA256(secret, token)`.
/// The token stays readable; only its integrity is protected.
///
/// ## Example
///
/// ```rust
/// use docsession_cookie::{CookieSigner, HmacSigner};
///
/// let signer = HmacSigner;
/// let value = signer.sign("abc123", "s3cret");
/// assert_eq!(signer.verify(&value, "s3cret").unwrap(), "abc123");
/// assert!(signer.verify(&value, "other").is_err());
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacSigner;

impl HmacSigner {
    fn mac(token: &str, secret: &str) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(token.as_bytes());
        mac
    }
}

impl CookieSigner for HmacSigner {
    fn sign(&self, token: &str, secret: &str) -> String {
        let signature = Self::mac(token, secret).finalize().into_bytes();
        format!(
            "{token}{SIGNATURE_SEPARATOR}{}",
            URL_SAFE_NO_PAD.encode(signature)
        )
    }

    fn verify(&self, cookie_value: &str, secret: &str) -> Result<String, CookieError> {
        // Split on the LAST separator: prefixed tokens may contain dots.
        let (token, signature) = cookie_value
            .rsplit_once(SIGNATURE_SEPARATOR)
            .ok_or(CookieError::InvalidSignature)?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| CookieError::InvalidSignature)?;

        // `verify_slice` compares in constant time.
        Self::mac(token, secret)
            .verify_slice(&signature)
            .map_err(|_| CookieError::InvalidSignature)?;

        Ok(token.to_string())
    }
}
