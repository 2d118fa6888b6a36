//! The per-engine key → entry map.
//!
//! All state transitions happen under one short-lived lock that is never held
//! across an `.await`. The map has no size bound: stale entries are dropped
//! lazily, by the lookup that finds them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::channel::oneshot;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::CacheKey;
use super::entry::{CacheEntry, Computation, Payload};
use crate::error::Result;

/// What a caller should do after [`EntryMap::claim`].
pub(crate) enum Claim<T> {
    /// A fresh value is cached.
    Hit(Arc<T>),
    /// Another caller is already computing this key.
    Join(Computation<T>),
    /// The caller owns a newly registered computation and must settle it.
    Lead(Flight<T>),
}

/// A registered computation that its leader is responsible for settling.
pub(crate) struct Flight<T> {
    pub(crate) ticket: u64,
    pub(crate) sender: oneshot::Sender<Result<Arc<T>>>,
    pub(crate) computation: Computation<T>,
}

struct Slots<T> {
    entries: HashMap<CacheKey, CacheEntry<T>>,
    next_ticket: u64,
}

pub(crate) struct EntryMap<T> {
    slots: Mutex<Slots<T>>,
    ttl: Duration,
}

impl<T> EntryMap<T> {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self {
            slots: Mutex::new(Slots {
                entries: HashMap::new(),
                next_ticket: 0,
            }),
            ttl,
        }
    }

    pub(crate) fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached value for `key` if it is fresh, evicting it if stale.
    pub(crate) fn lookup(&self, key: &CacheKey) -> Option<Arc<T>> {
        let mut slots = self.slots.lock();
        match &Self::usable(&mut slots.entries, key, self.ttl)?.payload {
            Payload::Ready(value) => Some(Arc::clone(value)),
            Payload::Pending { .. } => None,
        }
    }

    /// Resolves a cache hit, joins an in-flight computation, or registers a new one.
    ///
    /// With `force`, existing entries are ignored and a new computation replaces
    /// whatever the slot holds. The miss check and the registration happen under
    /// the same lock, so two concurrent callers can never both lead.
    pub(crate) fn claim(&self, key: &CacheKey, force: bool) -> Claim<T> {
        let mut slots = self.slots.lock();

        if !force {
            if let Some(entry) = Self::usable(&mut slots.entries, key, self.ttl) {
                return match &entry.payload {
                    Payload::Ready(value) => Claim::Hit(Arc::clone(value)),
                    Payload::Pending { computation, .. } => Claim::Join(computation.clone()),
                };
            }
        }

        slots.next_ticket += 1;
        let ticket = slots.next_ticket;
        let (sender, receiver) = oneshot::channel();
        let computation = receiver.shared();
        let displaced = slots
            .entries
            .remove(key)
            .and_then(|old| old.into_displaced(Instant::now(), self.ttl));
        slots.entries.insert(
            key.clone(),
            CacheEntry::pending(ticket, computation.clone(), displaced),
        );

        Claim::Lead(Flight {
            ticket,
            sender,
            computation,
        })
    }

    /// Stores a successful outcome, timestamped now.
    ///
    /// The write is skipped when the slot already belongs to a computation that
    /// started later, so a forced refresh is never overwritten by an older call
    /// that happens to finish after it. Returns whether the value was stored.
    pub(crate) fn settle(&self, key: &CacheKey, ticket: u64, value: Arc<T>) -> bool {
        let mut slots = self.slots.lock();
        match slots.entries.get(key) {
            Some(current) if current.ticket > ticket => false,
            _ => {
                slots
                    .entries
                    .insert(key.clone(), CacheEntry::ready(ticket, value));
                true
            }
        }
    }

    /// Drops the pending entry registered under `ticket`, if it is still there.
    ///
    /// A fresh value that a forced call displaced comes back, so a failed
    /// refresh leaves the cache as it found it.
    pub(crate) fn abandon(&self, key: &CacheKey, ticket: u64) {
        let mut slots = self.slots.lock();
        let owned = slots
            .entries
            .get(key)
            .is_some_and(|entry| entry.ticket == ticket && entry.is_pending());
        if !owned {
            return;
        }

        let displaced = slots
            .entries
            .remove(key)
            .and_then(|entry| entry.into_displaced(Instant::now(), self.ttl));
        if let Some(previous) = displaced {
            slots.entries.insert(key.clone(), *previous);
        }
    }

    pub(crate) fn remove(&self, key: &CacheKey) -> bool {
        self.slots.lock().entries.remove(key).is_some()
    }

    pub(crate) fn clear(&self) {
        self.slots.lock().entries.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.lock().entries.len()
    }

    fn usable<'a>(
        entries: &'a mut HashMap<CacheKey, CacheEntry<T>>,
        key: &CacheKey,
        ttl: Duration,
    ) -> Option<&'a CacheEntry<T>> {
        let now = Instant::now();
        if !entries.get(key)?.is_usable(now, ttl) {
            entries.remove(key);
            return None;
        }
        entries.get(key)
    }
}
