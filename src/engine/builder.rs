use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;

use super::{Inner, RequestCache};
use crate::cache::store::EntryMap;
use crate::codec::{AesGcmCodec, Codec, CodecError, PlainCodec};
use crate::hooks::{AfterHook, BeforeHook, HookError, SharedAfterHook, SharedBeforeHook};
use crate::http::Request;
use crate::settings::{CacheSettings, ConfigError};
use crate::transport::Transport;

/// Default freshness window.
const DEFAULT_TTL: Duration = Duration::from_secs(3);

/// Configures a [`RequestCache`]. Obtained from [`RequestCache::builder`].
///
/// Everything set here is fixed for the lifetime of the engine.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use bytes::Bytes;
/// use reqcache::RequestCache;
/// use reqcache::hooks::HeaderHook;
/// use reqcache::transport::{TransportError, transport_fn};
///
/// let transport = transport_fn(|_| async { Ok::<_, TransportError>(Bytes::from_static(b"1")) });
/// let cache = RequestCache::<u32>::builder(transport)
///     .ttl(Duration::from_secs(10))
///     .before_hook(HeaderHook::new("Authorization", "Bearer token"))
///     .after_fn(|request, value| println!("{} -> {value}", request.url()))
///     .build();
///
/// assert_eq!(cache.ttl(), Duration::from_secs(10));
/// ```
pub struct RequestCacheBuilder<T> {
    transport: Arc<dyn Transport>,
    ttl: Duration,
    codec: Arc<dyn Codec>,
    before_hooks: Vec<SharedBeforeHook>,
    after_hooks: Vec<SharedAfterHook<T>>,
}

impl<T> RequestCacheBuilder<T>
where
    T: DeserializeOwned + Send + Sync + 'static,
{
    pub(super) fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            ttl: DEFAULT_TTL,
            codec: Arc::new(PlainCodec),
            before_hooks: Vec::new(),
            after_hooks: Vec::new(),
        }
    }

    /// Sets how long a successful response stays fresh. A zero TTL disables
    /// reuse but keeps concurrent identical calls coalesced.
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the body codec.
    #[must_use]
    pub fn codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codec = Arc::new(codec);
        self
    }

    /// Enables AES-256-GCM body encryption with a raw 32-byte key.
    pub fn encryption_key(self, key: &[u8]) -> Result<Self, CodecError> {
        Ok(self.codec(AesGcmCodec::new(key)?))
    }

    /// Applies TTL and encryption from loaded settings.
    pub fn settings(mut self, settings: &CacheSettings) -> Result<Self, ConfigError> {
        self.codec = settings.codec()?;
        Ok(self.ttl(settings.ttl()))
    }

    /// Appends a before-hook. Hooks run in the order they are added.
    #[must_use]
    pub fn before_hook(mut self, hook: impl BeforeHook + 'static) -> Self {
        self.before_hooks.push(Arc::new(hook));
        self
    }

    /// Appends a closure as a before-hook.
    #[must_use]
    pub fn before_fn<F>(self, hook: F) -> Self
    where
        F: Fn(&mut Request) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.before_hook(hook)
    }

    /// Appends an after-hook. Hooks run in the order they are added.
    #[must_use]
    pub fn after_hook(mut self, hook: impl AfterHook<T> + 'static) -> Self {
        self.after_hooks.push(Arc::new(hook));
        self
    }

    /// Appends a closure as an after-hook.
    #[must_use]
    pub fn after_fn<F>(self, hook: F) -> Self
    where
        F: Fn(&Request, &T) + Send + Sync + 'static,
    {
        self.after_hook(hook)
    }

    pub fn build(self) -> RequestCache<T> {
        RequestCache {
            inner: Arc::new(Inner {
                entries: EntryMap::new(self.ttl),
                transport: self.transport,
                codec: self.codec,
                before_hooks: self.before_hooks,
                after_hooks: self.after_hooks,
            }),
        }
    }
}
