//! Error types for the cookie layer.
//!
//! None of these ever reach the caller of the session factory: a cookie
//! that fails verification is treated exactly like a missing cookie.

/// Errors produced while verifying a signed session cookie.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CookieError {
    /// The value wasn't signed under the configured secret. It was tampered
    /// with, signed with another secret, or lacks the `<token>.<signature>`
    /// shape altogether.
    #[error("invalid cookie signature")]
    InvalidSignature,
}
