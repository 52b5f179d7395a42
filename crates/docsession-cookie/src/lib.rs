//! Session cookies for Docsession.
//!
//! This crate covers everything that happens to the session identifier on
//! its way to and from the browser:
//!
//! - **Signing** ([`CookieSigner`] trait, [`HmacSigner`]): binding the
//!   identifier to a server secret so clients can't forge or alter it.
//! - **Attributes** ([`CookieOptions`]): name, path, domain and flags
//!   applied to every session cookie.
//! - **Rendering** ([`SetCookie`], [`parse_cookie_header`]): turning
//!   cookies into `Set-Cookie` header values and reading the incoming
//!   `Cookie` header.
//!
//! ```text
//! Cookie header → verify() → session id → ... → sign() → Set-Cookie
//! ```

mod codec;
mod error;
mod types;

pub use codec::{CookieSigner, HmacSigner};
pub use error::CookieError;
pub use types::{CookieOptions, SetCookie, parse_cookie_header};
