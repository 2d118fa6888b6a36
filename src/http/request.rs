//! Outgoing request types.
//!
//! A [`Request`] is the logical request: what the caller asked for and what
//! before-hooks may rewrite. It is also what the cache key is derived from.
//! A [`WireRequest`] is the same request after the body has been serialized
//! and passed through the configured [`Codec`](crate::codec::Codec); it is the
//! only thing a [`Transport`](crate::transport::Transport) ever sees.

use bytes::Bytes;
use serde_json::Value;

use super::{Headers, Method};
use crate::cache::CacheKey;
use crate::codec::Codec;
use crate::error::Error;

/// A logical HTTP request with an optional JSON body.
///
/// # Examples
///
/// ```
/// use reqcache::http::{Method, Request};
/// use serde_json::json;
///
/// let request = Request::new(Method::Post, "https://api.example.com/items")
///     .header("Accept", "application/json")
///     .json_body(json!({ "name": "widget" }));
///
/// assert_eq!(request.method(), &Method::Post);
/// assert_eq!(request.headers().get("accept"), Some("application/json"));
/// assert!(request.body().is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    method: Method,
    url: String,
    headers: Headers,
    body: Option<Value>,
}

impl Request {
    /// Creates a request with no headers and no body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Appends every header from `headers`.
    #[must_use]
    pub fn headers_from(mut self, headers: Headers) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn json_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the target URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the request headers for in-place modification.
    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    /// Returns the logical (unencoded) body.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Replaces the logical body.
    pub fn set_body(&mut self, body: Option<Value>) {
        self.body = body;
    }

    /// Derives the cache key identifying this request.
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::derive(&self.url, &self.method, &self.headers, self.body.as_ref())
    }

    /// Serializes the body and runs it through `codec`, producing what goes on the wire.
    ///
    /// A `Content-Type: application/json` header is added when there is a body
    /// and the caller did not set one.
    pub(crate) fn to_wire(&self, codec: &dyn Codec) -> Result<WireRequest, Error> {
        let mut headers = self.headers.clone();
        let body = match &self.body {
            Some(value) => {
                let json = serde_json::to_vec(value).map_err(Error::encode)?;
                if !headers.contains("content-type") {
                    headers.insert("Content-Type", "application/json");
                }
                Some(codec.encode(Bytes::from(json))?)
            }
            None => None,
        };

        Ok(WireRequest {
            method: self.method.clone(),
            url: self.url.clone(),
            headers,
            body,
        })
    }
}

/// Per-call options accepted by the verb helpers on
/// [`RequestCache`](crate::RequestCache).
///
/// # Examples
///
/// ```
/// use reqcache::http::RequestOptions;
///
/// let options = RequestOptions::new().header("Accept-Language", "de");
/// assert_eq!(options.headers().get("accept-language"), Some("de"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    headers: Headers,
}

impl RequestOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header that will be sent with the request.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Returns the configured headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub(crate) fn into_headers(self) -> Headers {
        self.headers
    }
}

/// A request as handed to the transport: body serialized and encoded.
#[derive(Debug, Clone)]
pub struct WireRequest {
    method: Method,
    url: String,
    headers: Headers,
    body: Option<Bytes>,
}

impl WireRequest {
    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the target URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns the headers to send.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Returns the encoded body bytes, if any.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }
}
