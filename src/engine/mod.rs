//! The request cache engine.
//!
//! [`RequestCache::execute`] is the only path to the transport. Every call
//! follows the same steps:
//!
//! 1. derive the [`CacheKey`] from the logical request,
//! 2. unless forced, return a fresh cached value or join the in-flight
//!    computation for that key,
//! 3. otherwise register a new computation and, on a spawned task, run the
//!    before-hooks and hand the request to the transport,
//! 4. on success store the value, run the after-hooks, and wake every waiter;
//!    on failure drop the pending entry, restore any fresh value a forced
//!    call displaced, and propagate the error.
//!
//! The computation runs detached from the caller: dropping the future returned
//! by `execute` does not cancel the network call, and the result still lands in
//! the cache for the other waiters.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use tokio::time::Instant;
use tracing::{debug, error, warn};

use crate::cache::CacheKey;
use crate::cache::store::{Claim, EntryMap, Flight};
use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::hooks::{HookError, SharedAfterHook, SharedBeforeHook};
use crate::http::Request;
use crate::transport::Transport;

mod builder;
mod verbs;

pub use builder::RequestCacheBuilder;

/// Deduplicating, TTL-bounded cache in front of a [`Transport`].
///
/// Values are decoded from JSON into `T` and shared as `Arc<T>`. Cloning the
/// engine is cheap; clones share the same cache.
///
/// The engine spawns onto the ambient tokio runtime, so it must be used from
/// within one.
///
/// # Examples
///
/// ```rust,no_run
/// use std::time::Duration;
/// use reqcache::{RequestCache, RequestOptions};
/// use reqcache::transport::HttpTransport;
///
/// #[derive(serde::Deserialize)]
/// struct User { name: String }
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let users = RequestCache::<User>::builder(HttpTransport::new()?)
///         .ttl(Duration::from_secs(5))
///         .build();
///
///     let user = users.get("https://api.example.com/me", RequestOptions::new(), false).await?;
///     println!("hello {}", user.name);
///     Ok(())
/// }
/// ```
pub struct RequestCache<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for RequestCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<T> {
    entries: EntryMap<T>,
    transport: Arc<dyn Transport>,
    codec: Arc<dyn Codec>,
    before_hooks: Vec<SharedBeforeHook>,
    after_hooks: Vec<SharedAfterHook<T>>,
}

impl<T> RequestCache<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    /// Creates an engine with default settings: 3 second TTL, no hooks, no encryption.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::builder(transport).build()
    }

    /// Starts configuring an engine around `transport`.
    pub fn builder(transport: impl Transport + 'static) -> RequestCacheBuilder<T> {
        RequestCacheBuilder::new(Arc::new(transport))
    }

    /// Returns the configured time-to-live.
    pub fn ttl(&self) -> Duration {
        self.inner.entries.ttl()
    }

    /// Returns the cached value for `request` if one is fresh, without side
    /// effects beyond evicting a stale entry.
    pub fn peek(&self, request: &Request) -> Option<Arc<T>> {
        self.inner.entries.lookup(&request.cache_key())
    }

    /// Removes the entry for `key`. Returns whether one existed.
    ///
    /// A computation already in flight for `key` still stores its result when
    /// it completes.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.inner.entries.remove(key)
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.inner.entries.clear();
    }

    /// Returns the number of entries, fresh, stale, or pending.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Returns `true` if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a cached result or performs `request`.
    ///
    /// With `force`, the cache is not consulted: the transport is always
    /// called and its result replaces the entry for this key.
    ///
    /// Concurrent calls for the same key share one transport call and all see
    /// its outcome, success or failure. Failures are never cached; the next
    /// call after a failure goes to the network again.
    ///
    /// # Errors
    ///
    /// - [`Error::Hook`]: a before-hook aborted; the transport was not called.
    /// - [`Error::Transport`]: network failure, timeout, or non-2xx status.
    /// - [`Error::Codec`] / [`Error::Decode`] / [`Error::Encode`]: the body
    ///   could not be encrypted, decrypted, or (de)serialized.
    /// - [`Error::Interrupted`]: the task driving the call died.
    pub async fn execute(&self, request: Request, force: bool) -> Result<Arc<T>> {
        let key = request.cache_key();

        match self.inner.entries.claim(&key, force) {
            Claim::Hit(value) => {
                debug!(key = %key, "cache hit");
                Ok(value)
            }
            Claim::Join(computation) => {
                debug!(key = %key, "joined in-flight request");
                computation.await.unwrap_or(Err(Error::Interrupted))
            }
            Claim::Lead(flight) => self.lead(key, request, flight, force).await,
        }
    }

    async fn lead(
        &self,
        key: CacheKey,
        request: Request,
        flight: Flight<T>,
        force: bool,
    ) -> Result<Arc<T>> {
        let Flight {
            ticket,
            sender,
            computation,
        } = flight;

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            let sender = sender;
            // Dropped before `sender`, so the slot is cleared before waiters wake.
            let _abandon = AbandonOnDrop {
                entries: &inner.entries,
                key: &key,
                ticket,
            };
            let outcome = inner.run(&key, ticket, request, force).await;
            let _ = sender.send(outcome);
        });

        computation.await.unwrap_or(Err(Error::Interrupted))
    }
}

impl<T> Inner<T>
where
    T: DeserializeOwned,
{
    /// Drives one computation to its outcome. The entry is settled or
    /// abandoned before this returns.
    async fn run(
        &self,
        key: &CacheKey,
        ticket: u64,
        mut request: Request,
        force: bool,
    ) -> Result<Arc<T>> {
        if let Err(err) = self.run_before_hooks(&mut request) {
            warn!(key = %key, error = %err, "before-hook aborted request");
            self.entries.abandon(key, ticket);
            return Err(err.into());
        }

        debug!(
            key = %key,
            method = %request.method(),
            url = request.url(),
            force,
            "cache miss, dispatching request"
        );

        let start = Instant::now();
        match self.call(&request).await {
            Ok(value) => {
                let stored = self.entries.settle(key, ticket, Arc::clone(&value));
                debug!(key = %key, stored, elapsed = ?start.elapsed(), "request settled");
                self.run_after_hooks(key, &request, &value);
                Ok(value)
            }
            Err(err) => {
                warn!(key = %key, error = %err, elapsed = ?start.elapsed(), "request failed");
                self.entries.abandon(key, ticket);
                Err(err)
            }
        }
    }

    fn run_before_hooks(&self, request: &mut Request) -> Result<(), HookError> {
        for hook in &self.before_hooks {
            hook.before(request)?;
        }
        Ok(())
    }

    /// A panicking after-hook is logged and skipped; the value is already
    /// cached and still reaches every waiter.
    fn run_after_hooks(&self, key: &CacheKey, request: &Request, value: &T) {
        for hook in &self.after_hooks {
            if catch_unwind(AssertUnwindSafe(|| hook.after(request, value))).is_err() {
                error!(key = %key, "after-hook panicked");
            }
        }
    }

    async fn call(&self, request: &Request) -> Result<Arc<T>> {
        let wire = request.to_wire(self.codec.as_ref())?;
        let raw = self.transport.perform(&wire).await?;
        let body = self.codec.decode(raw)?;
        decode_body(&body).map(Arc::new)
    }
}

/// Parses a response body. An empty body decodes as JSON `null`, so bodiless
/// responses (e.g. `204 No Content`) work with `T = ()` or `Option<_>`.
fn decode_body<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    let body: &[u8] = if body.is_empty() { b"null" } else { body };
    serde_json::from_slice(body).map_err(Error::decode)
}

/// Clears a still-pending entry if the computation task ends without settling
/// it (e.g. a hook or the transport panicked).
struct AbandonOnDrop<'a, T> {
    entries: &'a EntryMap<T>,
    key: &'a CacheKey,
    ticket: u64,
}

impl<T> Drop for AbandonOnDrop<'_, T> {
    fn drop(&mut self) {
        self.entries.abandon(self.key, self.ticket);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_decodes_as_null() {
        assert!(decode_body::<()>(&Bytes::new()).is_ok());
        let missing: Option<u32> = decode_body(&Bytes::new()).unwrap();
        assert_eq!(missing, None);
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        let err = decode_body::<u32>(&Bytes::from_static(b"{oops")).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }
}
