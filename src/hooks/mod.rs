//! Caller-supplied logic run around every transport call.
//!
//! Hooks only run when the engine actually goes to the network. A cache hit,
//! or joining a computation another caller started, runs no hooks at all.
//!
//! ## Core types
//!
//! - [`BeforeHook`]: may rewrite the outgoing [`Request`] in place. Hooks run
//!   in registration order; the first one that fails aborts the call before
//!   anything is sent or cached.
//! - [`AfterHook`]: observes the decoded value of a successful call. Runs in
//!   registration order, exactly once per successful transport call, never on
//!   failure. After-hooks cannot fail and cannot alter the cached value.
//! - [`HeaderHook`]: built-in before-hook that sets a fixed header.
//! - [`LoggingHook`]: built-in hook emitting a `tracing` event on both sides.
//!
//! Plain closures are hooks too:
//!
//! ```
//! use reqcache::hooks::{BeforeHook, HookError};
//! use reqcache::http::{Method, Request};
//!
//! let require_json = |request: &mut Request| -> Result<(), HookError> {
//!     if request.headers().contains("accept") {
//!         Ok(())
//!     } else {
//!         Err(HookError::new("missing Accept header"))
//!     }
//! };
//!
//! let mut request = Request::new(Method::Get, "/items");
//! assert!(require_json.before(&mut request).is_err());
//! ```

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::http::Request;

/// Failure raised by a [`BeforeHook`]; aborts the request.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct HookError {
    reason: String,
}

impl HookError {
    /// Creates an error carrying `reason`.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Returns the reason given by the hook.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// Logic run immediately before the transport call.
///
/// # Contract
///
/// - Implementations **must** be `Send + Sync`; the engine is shared across tasks.
/// - `before` runs synchronously. Nothing bounds how long it takes, so it
///   **should not** block.
/// - Returning `Err` aborts the call: the transport is not invoked, nothing is
///   cached, and the error reaches every caller waiting on this computation.
pub trait BeforeHook: Send + Sync {
    /// Inspect or rewrite the outgoing request.
    fn before(&self, request: &mut Request) -> Result<(), HookError>;
}

impl<F> BeforeHook for F
where
    F: Fn(&mut Request) -> Result<(), HookError> + Send + Sync,
{
    fn before(&self, request: &mut Request) -> Result<(), HookError> {
        (self)(request)
    }
}

/// Logic run after a successful transport call, once the value is cached.
///
/// `request` is the request as it was sent, after every before-hook ran.
pub trait AfterHook<T>: Send + Sync {
    /// Observe the decoded value.
    fn after(&self, request: &Request, value: &T);
}

impl<T, F> AfterHook<T> for F
where
    F: Fn(&Request, &T) + Send + Sync,
{
    fn after(&self, request: &Request, value: &T) {
        (self)(request, value)
    }
}

/// A reference-counted before-hook, as stored by the engine.
pub type SharedBeforeHook = Arc<dyn BeforeHook>;

/// A reference-counted after-hook, as stored by the engine.
pub type SharedAfterHook<T> = Arc<dyn AfterHook<T>>;

/// Before-hook that sets a header on every outgoing request, replacing any
/// value the caller supplied.
///
/// # Examples
///
/// ```
/// use reqcache::hooks::{BeforeHook, HeaderHook};
/// use reqcache::http::{Method, Request};
///
/// let auth = HeaderHook::new("Authorization", "Bearer secret");
/// let mut request = Request::new(Method::Get, "/me");
/// auth.before(&mut request).unwrap();
/// assert_eq!(request.headers().get("authorization"), Some("Bearer secret"));
/// ```
#[derive(Debug, Clone)]
pub struct HeaderHook {
    name: String,
    value: String,
}

impl HeaderHook {
    /// Creates a hook that sets `name: value`.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl BeforeHook for HeaderHook {
    fn before(&self, request: &mut Request) -> Result<(), HookError> {
        request.headers_mut().set(self.name.clone(), self.value.clone());
        Ok(())
    }
}

/// Built-in hook that logs each transport call and its successful result.
///
/// Register it on both sides to get a pair of `INFO` lines per network call:
///
/// ```text
/// METHOD url - sending
/// METHOD url - settled
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingHook;

impl BeforeHook for LoggingHook {
    fn before(&self, request: &mut Request) -> Result<(), HookError> {
        info!("{} {} - sending", request.method(), request.url());
        Ok(())
    }
}

impl<T> AfterHook<T> for LoggingHook {
    fn after(&self, request: &Request, _value: &T) {
        info!("{} {} - settled", request.method(), request.url());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::http::Method;

    #[test]
    fn header_hook_replaces_caller_value() {
        let mut request = Request::new(Method::Get, "/x").header("Authorization", "Bearer old");
        HeaderHook::new("Authorization", "Bearer new")
            .before(&mut request)
            .unwrap();
        let all: Vec<_> = request.headers().get_all("authorization").collect();
        assert_eq!(all, vec!["Bearer new"]);
    }

    #[test]
    fn closures_are_after_hooks() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let hook: SharedAfterHook<u32> = Arc::new(move |_: &Request, value: &u32| {
            sink.lock().unwrap().push(*value);
        });

        let request = Request::new(Method::Get, "/x");
        hook.after(&request, &3);
        hook.after(&request, &4);
        assert_eq!(*seen.lock().unwrap(), vec![3, 4]);
    }

    /// Collects formatted log output for assertions.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn logging_hook_emits_both_lines_at_info() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(captured.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut request = Request::new(Method::Get, "/users");
            LoggingHook.before(&mut request).unwrap();
            AfterHook::<u8>::after(&LoggingHook, &request, &1);
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("GET /users - sending"), "{output}");
        assert!(output.contains("GET /users - settled"), "{output}");
    }

    #[test]
    fn logging_hook_never_aborts() {
        let mut request = Request::new(Method::Delete, "/x");
        assert!(LoggingHook.before(&mut request).is_ok());
        AfterHook::<()>::after(&LoggingHook, &request, &());
    }

    #[test]
    fn hook_error_keeps_reason() {
        let err = HookError::new("token expired");
        assert_eq!(err.reason(), "token expired");
        assert_eq!(err.to_string(), "token expired");
    }
}
