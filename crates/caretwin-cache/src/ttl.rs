//! A concurrent string-keyed cache with per-entry time-to-live.
//!
//! Mutations on a single key are atomic with respect to each other
//! (sharded map, last-writer-wins); there is no global lock and no
//! cross-key transaction. Expiry is lazy: an expired entry is dropped on
//! the read that observes it. Reverse lookups scan the forward map, which
//! is acceptable because cardinality is bounded by active room/user
//! counts, not event volume.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use time::OffsetDateTime;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: OffsetDateTime,
}

/// Hit/miss counters and entry count, surfaced through tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Concurrent TTL cache.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    default_ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache whose `put` applies the given default TTL.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Insert or overwrite a mapping with the default TTL.
    pub fn put(&self, key: impl Into<String>, value: V) {
        self.put_with_ttl(key, value, self.default_ttl);
    }

    /// Insert or overwrite a mapping with an explicit TTL.
    pub fn put_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: OffsetDateTime::now_utc() + ttl,
        };
        self.entries.insert(key.into(), entry);
    }

    /// Replace the value for a key that is currently mapped (and not
    /// expired). Returns false when the key is absent.
    pub fn replace(&self, key: &str, value: V, ttl: Duration) -> bool {
        let now = OffsetDateTime::now_utc();
        match self.entries.get_mut(key) {
            Some(mut entry) if entry.expires_at > now => {
                entry.value = value;
                entry.expires_at = now + ttl;
                true
            }
            _ => false,
        }
    }

    /// Look up a key, dropping the entry if its TTL has elapsed.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = OffsetDateTime::now_utc();
        let expired = match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            // Guarded so a concurrent overwrite with a fresh TTL survives.
            self.entries.remove_if(key, |_, e| e.expires_at <= now);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Remove a mapping, returning the value if one was present.
    pub fn remove(&self, key: &str) -> Option<V> {
        self.entries.remove(key).map(|(_, entry)| entry.value)
    }

    /// Keys whose live value satisfies the predicate. Linear scan under
    /// the forward map.
    pub fn keys_matching(&self, mut predicate: impl FnMut(&V) -> bool) -> Vec<String> {
        let now = OffsetDateTime::now_utc();
        self.entries
            .iter()
            .filter(|entry| entry.expires_at > now && predicate(&entry.value))
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Drop every expired entry. Expiry is otherwise lazy; this is for
    /// periodic housekeeping.
    pub fn purge_expired(&self) -> usize {
        let now = OffsetDateTime::now_utc();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before - self.entries.len()
    }

    /// Entry count, including entries whose lazy expiry has not run yet.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len(),
        }
    }
}
