//! `reqwest`-backed transport.

use std::time::Duration;

use bytes::Bytes;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use super::{Transport, TransportError};
use crate::http::WireRequest;

/// Request timeout used by [`HttpTransport::new`].
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends requests over HTTP(S) with a shared `reqwest` connection pool.
///
/// Non-2xx responses become [`TransportError::Status`] carrying the response
/// body, so error payloads are never mistaken for cacheable data.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with a 30 second request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Network`] if the underlying client cannot be
    /// initialised (e.g. the TLS backend fails to load).
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Creates a transport whose requests fail with [`TransportError::Timeout`]
    /// after `timeout`.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(classify)?;
        Ok(Self { client })
    }

    /// Wraps an existing client, keeping its configuration as-is.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn user_agent() -> &'static str {
        concat!("reqcache/", env!("CARGO_PKG_VERSION"))
    }

    async fn send(&self, request: &WireRequest) -> Result<Bytes, TransportError> {
        let method = reqwest::Method::from_bytes(request.method().as_str().as_bytes())
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let mut builder = self.client.request(method, request.url());
        for (name, value) in request.headers().iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body() {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let body = response.bytes().await.map_err(classify)?;

        if !status.is_success() {
            warn!(
                method = %request.method(),
                url = request.url(),
                status = status.as_u16(),
                "non-success response"
            );
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(
            method = %request.method(),
            url = request.url(),
            status = status.as_u16(),
            bytes = body.len(),
            "response received"
        );
        Ok(body)
    }
}

impl Transport for HttpTransport {
    fn perform<'a>(
        &'a self,
        request: &'a WireRequest,
    ) -> BoxFuture<'a, Result<Bytes, TransportError>> {
        Box::pin(self.send(request))
    }
}

fn classify(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else if err.is_builder() {
        TransportError::InvalidRequest(err.to_string())
    } else {
        TransportError::Network(err.to_string())
    }
}
