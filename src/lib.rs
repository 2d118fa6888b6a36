//! # reqcache
//!
//! Client-side request deduplication and TTL response caching for async HTTP.
//!
//! A [`RequestCache`] sits in front of a [`Transport`](transport::Transport)
//! and decides, per logical request, whether a recent equivalent result can be
//! reused. Concurrent identical requests share a single network call, and
//! successful results are served from memory until they are `ttl` old.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reqcache::{RequestCache, RequestOptions};
//! use reqcache::transport::HttpTransport;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cache = RequestCache::<serde_json::Value>::new(HttpTransport::new()?);
//!
//!     let first = cache.get("https://httpbin.org/json", RequestOptions::new(), false).await?;
//!     // Served from memory for the next three seconds.
//!     let second = cache.get("https://httpbin.org/json", RequestOptions::new(), false).await?;
//!     assert_eq!(first, second);
//!     Ok(())
//! }
//! ```

// ── Core ──────────────────────────────────────────────────────────────────────
pub mod cache;
pub mod engine;
pub mod error;

// ── Collaborators and plumbing ────────────────────────────────────────────────
pub mod codec;
pub mod hooks;
pub mod http;
pub mod settings;
pub mod transport;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use cache::CacheKey;
pub use engine::{RequestCache, RequestCacheBuilder};
pub use error::{Error, Result};
pub use http::{Headers, Method, Request, RequestOptions};
pub use settings::CacheSettings;
