//! Transports: the single capability the engine needs from the network.
//!
//! A [`Transport`] takes a [`WireRequest`] and yields the raw response body
//! or a [`TransportError`]. The engine never looks inside the failure; it
//! propagates it unchanged and caches nothing.
//!
//! - [`HttpTransport`]: the default, backed by `reqwest`.
//! - [`transport_fn`]: adapts an async closure, handy for in-process fakes.

use std::future::Future;

use bytes::Bytes;
use futures::FutureExt;
use futures::future::BoxFuture;
use thiserror::Error;

use crate::http::WireRequest;

mod client;

pub use client::HttpTransport;

/// Failures a transport can report.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("server responded with status {status}")]
    Status { status: u16, body: Bytes },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Returns the HTTP status for [`TransportError::Status`] failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Performs one network call.
///
/// # Contract
///
/// - A non-2xx response **must** be reported as [`TransportError::Status`],
///   never as a successful body.
/// - Any timeout is the transport's to enforce; the engine waits as long as
///   the returned future does.
/// - The future may be driven on a different task than the one that called
///   `perform`, so it must be `Send`.
pub trait Transport: Send + Sync {
    /// Send `request` and return the raw response body.
    fn perform<'a>(
        &'a self,
        request: &'a WireRequest,
    ) -> BoxFuture<'a, Result<Bytes, TransportError>>;
}

/// A [`Transport`] built from an async closure; see [`transport_fn`].
#[derive(Clone)]
pub struct FnTransport<F> {
    f: F,
}

/// Wraps `f` as a [`Transport`]. The closure receives an owned copy of the request.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use reqcache::transport::{TransportError, transport_fn};
///
/// let transport = transport_fn(|request| async move {
///     Ok::<_, TransportError>(Bytes::from(format!(r#"{{"url":"{}"}}"#, request.url())))
/// });
/// # let _ = transport;
/// ```
pub fn transport_fn<F, Fut>(f: F) -> FnTransport<F>
where
    F: Fn(WireRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Bytes, TransportError>> + Send + 'static,
{
    FnTransport { f }
}

impl<F, Fut> Transport for FnTransport<F>
where
    F: Fn(WireRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Bytes, TransportError>> + Send + 'static,
{
    fn perform<'a>(
        &'a self,
        request: &'a WireRequest,
    ) -> BoxFuture<'a, Result<Bytes, TransportError>> {
        (self.f)(request.clone()).boxed()
    }
}
