//! TTL cache storage.
//!
//! All entries live behind one `RwLock`. Lookups share the read lock; inserts,
//! deletes, prefix invalidation and `clear` take the write lock, so structural
//! mutations exclude each other and are visible to every later lookup.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use metrics::counter;
use tokio::time::Instant;
use tracing::debug;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

pub(crate) const METRIC_CACHE_HIT: &str = "plume_cache_hit_total";
pub(crate) const METRIC_CACHE_MISS: &str = "plume_cache_miss_total";
pub(crate) const METRIC_CACHE_EXPIRED: &str = "plume_cache_expired_total";
pub(crate) const METRIC_CACHE_INVALIDATE: &str = "plume_cache_invalidate_total";

// ============================================================================
// Entry
// ============================================================================

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Option<Duration>) -> Self {
        let expires_at = ttl
            .filter(|ttl| !ttl.is_zero())
            .map(|ttl| Instant::now() + ttl);
        Self { value, expires_at }
    }

    /// An entry is stale from its expiry instant onwards.
    fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|expires_at| now >= expires_at)
    }
}

struct Inner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// Bumped by every invalidation; see [`TtlCache::set_if_generation`].
    generation: u64,
}

// ============================================================================
// TtlCache
// ============================================================================

/// String-keyed cache with optional per-entry expiry.
///
/// Expired entries are never returned; they are removed lazily by the lookup
/// that finds them. The cache never fails: a disabled cache behaves as a
/// permanent miss.
pub struct TtlCache<V> {
    inner: RwLock<Inner<V>>,
    enabled: bool,
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(true)
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new(enabled: bool) -> Self {
        Self {
            inner: RwLock::new(Inner {
                entries: HashMap::new(),
                generation: 0,
            }),
            enabled,
        }
    }

    /// Returns a clone of the live value stored under `key`.
    pub fn get(&self, key: &str) -> Option<V> {
        if !self.enabled {
            counter!(METRIC_CACHE_MISS).increment(1);
            return None;
        }

        let now = Instant::now();
        {
            let inner = rw_read(&self.inner, SOURCE, "get");
            match inner.entries.get(key) {
                None => {
                    counter!(METRIC_CACHE_MISS).increment(1);
                    return None;
                }
                Some(entry) if !entry.is_expired_at(now) => {
                    counter!(METRIC_CACHE_HIT).increment(1);
                    return Some(entry.value.clone());
                }
                Some(_) => {}
            }
        }

        // Between the two guards another caller may have replaced or removed
        // the entry; only evict what is still expired.
        let mut inner = rw_write(&self.inner, SOURCE, "evict_expired");
        if inner
            .entries
            .get(key)
            .is_some_and(|entry| entry.is_expired_at(now))
        {
            inner.entries.remove(key);
            counter!(METRIC_CACHE_EXPIRED).increment(1);
            debug!(target: "plume::cache", key, "Evicted expired cache entry");
        }
        counter!(METRIC_CACHE_MISS).increment(1);
        None
    }

    /// Stores `value` under `key`; `None` or a zero TTL never expires.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Option<Duration>) {
        if !self.enabled {
            return;
        }
        let mut inner = rw_write(&self.inner, SOURCE, "set");
        inner.entries.insert(key.into(), CacheEntry::new(value, ttl));
    }

    /// Stores `value` only when no invalidation happened since `generation`
    /// was observed. Returns whether the value was stored.
    ///
    /// A reader captures [`generation`](Self::generation) before querying the
    /// backend; if a writer invalidates in between, the now stale result is
    /// dropped instead of being cached.
    pub fn set_if_generation(
        &self,
        generation: u64,
        key: impl Into<String>,
        value: V,
        ttl: Option<Duration>,
    ) -> bool {
        if !self.enabled {
            return false;
        }
        let mut inner = rw_write(&self.inner, SOURCE, "set_if_generation");
        if inner.generation != generation {
            return false;
        }
        inner.entries.insert(key.into(), CacheEntry::new(value, ttl));
        true
    }

    pub fn delete(&self, key: &str) -> bool {
        let mut inner = rw_write(&self.inner, SOURCE, "delete");
        inner.generation = inner.generation.wrapping_add(1);
        let removed = inner.entries.remove(key).is_some();
        counter!(METRIC_CACHE_INVALIDATE, "scope" => "key").increment(1);
        removed
    }

    /// Removes every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut inner = rw_write(&self.inner, SOURCE, "invalidate_prefix");
        inner.generation = inner.generation.wrapping_add(1);
        let before = inner.entries.len();
        inner.entries.retain(|key, _| !key.starts_with(prefix));
        counter!(METRIC_CACHE_INVALIDATE, "scope" => "prefix").increment(1);
        before - inner.entries.len()
    }

    /// Drops every entry at once. Lookups that start after `clear` returns
    /// see none of the previous entries.
    pub fn clear(&self) -> usize {
        let mut inner = rw_write(&self.inner, SOURCE, "clear");
        inner.generation = inner.generation.wrapping_add(1);
        let removed = inner.entries.len();
        inner.entries.clear();
        counter!(METRIC_CACHE_INVALIDATE, "scope" => "all").increment(1);
        removed
    }

    pub fn generation(&self) -> u64 {
        rw_read(&self.inner, SOURCE, "generation").generation
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        rw_read(&self.inner, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
