//! Cache entries and the freshness rule.

use std::sync::Arc;
use std::time::Duration;

use futures::channel::oneshot;
use futures::future::Shared;
use tokio::time::Instant;

use crate::error::Result;

/// A computation that concurrent callers for the same key can all await.
///
/// Resolves to `Err(Canceled)` if the task driving it went away without
/// reporting an outcome.
pub(crate) type Computation<T> = Shared<oneshot::Receiver<Result<Arc<T>>>>;

/// Returns `true` while an entry created at `created_at` is still usable at `now`.
///
/// The comparison is strict: an entry exactly `ttl` old is stale.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use reqcache::cache::is_fresh;
/// use tokio::time::Instant;
///
/// let created = Instant::now();
/// let ttl = Duration::from_secs(3);
/// assert!(is_fresh(created, created + Duration::from_millis(2_999), ttl));
/// assert!(!is_fresh(created, created + ttl, ttl));
/// ```
pub fn is_fresh(created_at: Instant, now: Instant, ttl: Duration) -> bool {
    now.saturating_duration_since(created_at) < ttl
}

pub(crate) enum Payload<T> {
    /// A settled, successful value.
    Ready(Arc<T>),
    /// A computation that has not settled yet.
    Pending {
        computation: Computation<T>,
        /// The fresh value this computation replaced, restored if it fails.
        displaced: Option<Box<CacheEntry<T>>>,
    },
}

pub(crate) struct CacheEntry<T> {
    pub(crate) created_at: Instant,
    /// Start order of the computation that produced this entry.
    pub(crate) ticket: u64,
    pub(crate) payload: Payload<T>,
}

impl<T> CacheEntry<T> {
    pub(crate) fn pending(
        ticket: u64,
        computation: Computation<T>,
        displaced: Option<Box<CacheEntry<T>>>,
    ) -> Self {
        Self {
            created_at: Instant::now(),
            ticket,
            payload: Payload::Pending {
                computation,
                displaced,
            },
        }
    }

    pub(crate) fn ready(ticket: u64, value: Arc<T>) -> Self {
        Self {
            created_at: Instant::now(),
            ticket,
            payload: Payload::Ready(value),
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        matches!(self.payload, Payload::Pending { .. })
    }

    /// Pending entries never go stale; they have not produced anything yet.
    pub(crate) fn is_usable(&self, now: Instant, ttl: Duration) -> bool {
        self.is_pending() || is_fresh(self.created_at, now, ttl)
    }

    /// The fresh value worth keeping if a new computation replaces this entry.
    ///
    /// A pending entry hands over whatever it displaced itself.
    pub(crate) fn into_displaced(self, now: Instant, ttl: Duration) -> Option<Box<Self>> {
        match self.payload {
            Payload::Ready(_) if is_fresh(self.created_at, now, ttl) => Some(Box::new(self)),
            Payload::Ready(_) => None,
            Payload::Pending { displaced, .. } => displaced,
        }
    }
}
