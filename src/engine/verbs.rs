//! Per-verb helpers.
//!
//! Each verb comes in two flavours sharing [`RequestCache::execute`]:
//!
//! - `get`, `post`, `put`, `delete`: a single deferred result;
//! - `get_stream`, `post_stream`, `put_stream`, `delete_stream`: a lazy
//!   stream that yields exactly one item when first polled and then ends.
//!   Nothing is looked up or sent until the stream is polled.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::{self, BoxStream};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::RequestCache;
use crate::error::{Error, Result};
use crate::http::{Method, Request, RequestOptions};

impl<T> RequestCache<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    /// Sends (or reuses) a `GET` request.
    pub async fn get(
        &self,
        url: impl Into<String>,
        options: RequestOptions,
        force: bool,
    ) -> Result<Arc<T>> {
        self.execute(build(Method::Get, url, None, options), force)
            .await
    }

    /// Sends (or reuses) a `POST` request with a JSON body.
    pub async fn post<B: Serialize + ?Sized>(
        &self,
        url: impl Into<String>,
        body: &B,
        options: RequestOptions,
        force: bool,
    ) -> Result<Arc<T>> {
        let request = build(Method::Post, url, Some(to_json(body)?), options);
        self.execute(request, force).await
    }

    /// Sends (or reuses) a `PUT` request with a JSON body.
    pub async fn put<B: Serialize + ?Sized>(
        &self,
        url: impl Into<String>,
        body: &B,
        options: RequestOptions,
        force: bool,
    ) -> Result<Arc<T>> {
        let request = build(Method::Put, url, Some(to_json(body)?), options);
        self.execute(request, force).await
    }

    /// Sends (or reuses) a `DELETE` request.
    pub async fn delete(
        &self,
        url: impl Into<String>,
        options: RequestOptions,
        force: bool,
    ) -> Result<Arc<T>> {
        self.execute(build(Method::Delete, url, None, options), force)
            .await
    }

    /// Stream flavour of [`get`](Self::get).
    pub fn get_stream(
        &self,
        url: impl Into<String>,
        options: RequestOptions,
        force: bool,
    ) -> BoxStream<'static, Result<Arc<T>>> {
        self.once(Ok(build(Method::Get, url, None, options)), force)
    }

    /// Stream flavour of [`post`](Self::post). A body that fails to serialize
    /// is reported as the stream's only item.
    pub fn post_stream<B: Serialize + ?Sized>(
        &self,
        url: impl Into<String>,
        body: &B,
        options: RequestOptions,
        force: bool,
    ) -> BoxStream<'static, Result<Arc<T>>> {
        let request = to_json(body).map(|body| build(Method::Post, url, Some(body), options));
        self.once(request, force)
    }

    /// Stream flavour of [`put`](Self::put).
    pub fn put_stream<B: Serialize + ?Sized>(
        &self,
        url: impl Into<String>,
        body: &B,
        options: RequestOptions,
        force: bool,
    ) -> BoxStream<'static, Result<Arc<T>>> {
        let request = to_json(body).map(|body| build(Method::Put, url, Some(body), options));
        self.once(request, force)
    }

    /// Stream flavour of [`delete`](Self::delete).
    pub fn delete_stream(
        &self,
        url: impl Into<String>,
        options: RequestOptions,
        force: bool,
    ) -> BoxStream<'static, Result<Arc<T>>> {
        self.once(Ok(build(Method::Delete, url, None, options)), force)
    }

    fn once(
        &self,
        request: Result<Request>,
        force: bool,
    ) -> BoxStream<'static, Result<Arc<T>>> {
        let engine = self.clone();
        stream::once(async move { engine.execute(request?, force).await }).boxed()
    }
}

fn build(
    method: Method,
    url: impl Into<String>,
    body: Option<Value>,
    options: RequestOptions,
) -> Request {
    let request = Request::new(method, url).headers_from(options.into_headers());
    match body {
        Some(body) => request.json_body(body),
        None => request,
    }
}

fn to_json<B: Serialize + ?Sized>(body: &B) -> Result<Value> {
    serde_json::to_value(body).map_err(Error::encode)
}
