//! Caching primitives: key derivation, freshness, and the entry map.
//!
//! - [`CacheKey`]: deterministic identity of a logical request.
//! - [`is_fresh`]: the TTL rule shared by every lookup.
//!
//! The entry map itself is private to the engine; it is reached through
//! [`RequestCache`](crate::RequestCache).

mod entry;
mod key;
pub(crate) mod store;

pub use entry::is_fresh;
pub use key::CacheKey;
