//! TTL-bound map keyed by `(issuer, id)`.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

pub(crate) type Key = (String, String);

pub(crate) fn key(issuer: &str, id: &str) -> Key {
    (issuer.to_string(), id.to_string())
}

/// Value with its expiration time.
#[derive(Debug, Clone)]
pub(crate) struct Entry<V> {
    pub value: V,
    /// `None` when the TTL reaches past what `Instant` can represent.
    pub expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now().checked_add(ttl),
        }
    }

    pub fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// Concurrent map whose entries disappear after a fixed TTL.
///
/// Expired entries read as absent. They are reclaimed lazily on access and
/// in bulk by [`cleanup_expired`](Self::cleanup_expired).
#[derive(Debug)]
pub(crate) struct ExpiringMap<V> {
    name: &'static str,
    entries: DashMap<Key, Entry<V>>,
    ttl: Duration,
}

impl<V: Clone> ExpiringMap<V> {
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            entries: DashMap::new(),
            ttl,
        }
    }

    /// Stores `value` and returns its TTL.
    pub fn insert(&self, issuer: &str, id: &str, value: V) -> Duration {
        self.entries
            .insert(key(issuer, id), Entry::new(value, self.ttl));
        self.ttl
    }

    pub fn get(&self, issuer: &str, id: &str) -> Option<V> {
        let key = key(issuer, id);
        let now = Instant::now();

        if let Some(entry) = self.entries.get(&key) {
            if entry.is_live(now) {
                return Some(entry.value.clone());
            }
        }
        // The read guard is gone by now; removing under it would deadlock.
        self.entries.remove_if(&key, |_, entry| !entry.is_live(now));
        None
    }

    /// Removes the entry. Returns `None` if it was absent or already
    /// expired, so exactly one of several concurrent callers sees `Some`.
    pub fn remove(&self, issuer: &str, id: &str) -> Option<V> {
        let now = Instant::now();
        self.entries
            .remove(&key(issuer, id))
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(_, entry)| entry.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Drops expired entries and returns how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut removed = 0;

        self.entries.retain(|_, entry| {
            if entry.is_live(now) {
                true
            } else {
                removed += 1;
                false
            }
        });

        if removed > 0 {
            debug!(store = self.name, removed, "Expired entries removed");
        }
        removed
    }
}
