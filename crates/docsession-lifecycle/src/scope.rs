//! Request-scoped glue between the factory and the web framework.
//!
//! The factory reads the session cookie from a [`RequestScope`] and, when it
//! needs to touch the response, registers a callback instead of writing
//! directly: the response doesn't exist yet when the session is resolved.
//! The framework calls [`RequestScope::finish`] once the handler is done to
//! collect the cookies to send.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use docsession_cookie::{SetCookie, parse_cookie_header};

type ResponseCallback = Box<dyn FnOnce(&mut ResponseCookies) + Send>;

// ---------------------------------------------------------------------------
// ResponseCookies
// ---------------------------------------------------------------------------

/// What response callbacks write into.
#[derive(Debug, Default)]
pub struct ResponseCookies {
    exception: bool,
    cookies: Vec<SetCookie>,
}

impl ResponseCookies {
    /// `exception` tells callbacks the response is rendered while handling
    /// an error.
    pub fn new(exception: bool) -> Self {
        Self {
            exception,
            cookies: Vec::new(),
        }
    }

    /// Returns `true` if the response is rendered while handling an error.
    pub fn is_exception(&self) -> bool {
        self.exception
    }

    /// Queues a cookie on the response.
    pub fn push(&mut self, cookie: SetCookie) {
        self.cookies.push(cookie);
    }

    /// Cookies queued so far, in order.
    pub fn cookies(&self) -> &[SetCookie] {
        &self.cookies
    }

    /// One `Set-Cookie` header value per queued cookie.
    pub fn header_values(&self) -> Vec<String> {
        self.cookies.iter().map(SetCookie::header_value).collect()
    }

    pub fn into_cookies(self) -> Vec<SetCookie> {
        self.cookies
    }
}

// ---------------------------------------------------------------------------
// ResponseCallbacks
// ---------------------------------------------------------------------------

/// Callbacks to run against the response, in registration order.
///
/// Cloning shares the registry, so a session can hold on to a handle and
/// register more callbacks later in the request.
#[derive(Clone, Default)]
pub struct ResponseCallbacks {
    callbacks: Arc<Mutex<Vec<ResponseCallback>>>,
}

impl ResponseCallbacks {
    /// Registers a callback.
    pub fn add(&self, callback: impl FnOnce(&mut ResponseCookies) + Send + 'static) {
        self.lock().push(Box::new(callback));
    }

    /// Number of callbacks waiting to run.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Runs and removes every registered callback.
    pub fn run(&self, response: &mut ResponseCookies) {
        // Take the callbacks out first: a callback may register another.
        let callbacks = std::mem::take(&mut *self.lock());
        for callback in callbacks {
            callback(response);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ResponseCallback>> {
        // A panicking callback can't leave the Vec half-written.
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ResponseCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseCallbacks")
            .field("pending", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// RequestScope
// ---------------------------------------------------------------------------

/// The parts of an incoming request the session layer needs.
#[derive(Debug, Clone, Default)]
pub struct RequestScope {
    cookies: HashMap<String, String>,
    callbacks: ResponseCallbacks,
}

impl RequestScope {
    /// A request without cookies.
    pub fn new() -> Self {
        Self::default()
    }

    /// A request carrying the given `Cookie` header.
    pub fn from_cookie_header(header: &str) -> Self {
        Self {
            cookies: parse_cookie_header(header).into_iter().collect(),
            callbacks: ResponseCallbacks::default(),
        }
    }

    /// Adds an incoming cookie.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Value of the incoming cookie `name`.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// The response callback registry for this request.
    pub fn callbacks(&self) -> &ResponseCallbacks {
        &self.callbacks
    }

    /// Runs the response callbacks and returns the cookies to send.
    ///
    /// `exception` is `true` when the response is rendered while handling
    /// an error.
    pub fn finish(&self, exception: bool) -> ResponseCookies {
        let mut response = ResponseCookies::new(exception);
        self.callbacks.run(&mut response);
        response
    }
}

#[cfg(test)]
mod tests {
    use docsession_cookie::CookieOptions;

    use super::*;

    #[test]
    fn test_from_cookie_header_reads_pairs() {
        let scope = RequestScope::from_cookie_header("a=1; session=tok.sig");
        assert_eq!(scope.cookie("session"), Some("tok.sig"));
        assert_eq!(scope.cookie("a"), Some("1"));
        assert_eq!(scope.cookie("missing"), None);
    }

    #[test]
    fn test_finish_runs_callbacks_in_order() {
        let scope = RequestScope::new();
        let options = CookieOptions::default();
        let first = options.set_cookie("first");
        scope.callbacks().add(move |r| r.push(first));
        let removal = options.removal_cookie();
        scope.callbacks().add(move |r| r.push(removal));
        assert_eq!(scope.callbacks().len(), 2);

        let response = scope.finish(false);
        assert_eq!(response.cookies().len(), 2);
        assert_eq!(response.cookies()[0].value(), "first");
        assert!(response.cookies()[1].is_removal());
        assert!(scope.callbacks().is_empty());
    }

    #[test]
    fn test_finish_passes_exception_flag() {
        let scope = RequestScope::new();
        let seen = Arc::new(Mutex::new(None));
        let seen_in_callback = Arc::clone(&seen);
        scope.callbacks().add(move |r| {
            *seen_in_callback.lock().unwrap() = Some(r.is_exception());
        });
        scope.finish(true);
        assert_eq!(*seen.lock().unwrap(), Some(true));
    }

    #[test]
    fn test_callback_registering_callback_does_not_deadlock() {
        let scope = RequestScope::new();
        let callbacks = scope.callbacks().clone();
        scope.callbacks().add(move |_| {
            callbacks.add(|r| r.push(CookieOptions::default().set_cookie("late")));
        });
        let response = scope.finish(false);
        assert!(response.cookies().is_empty());
        assert_eq!(scope.callbacks().len(), 1);
    }
}
