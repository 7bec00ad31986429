//! Compiled predicate cache
//!
//! Bounded map from (schema fingerprint, normalized rule text) to a compiled
//! [`Predicate`]. Reads do not refresh recency, so once full the cache
//! evicts the oldest inserted entry first.

use super::Predicate;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use sieve_core::{ContentHash, DEFAULT_CACHE_CAPACITY};
use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

/// Key for cached predicates.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CacheKey {
    /// Hex fingerprint of the schema the rule was compiled against
    pub schema: String,
    /// Normalized rule text
    pub source: String,
}

impl CacheKey {
    pub fn new(fingerprint: &ContentHash, source: impl Into<String>) -> Self {
        Self {
            schema: hex::encode(fingerprint),
            source: source.into(),
        }
    }
}

/// Statistics about cache performance
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// Current number of entries
    pub entries: usize,
}

struct Inner {
    entries: LruCache<CacheKey, Predicate>,
    stats: CacheStats,
}

/// Thread-safe predicate cache with a fixed capacity.
pub struct PredicateCache {
    inner: Mutex<Inner>,
    capacity: NonZeroUsize,
}

impl PredicateCache {
    /// Create a cache holding at most `capacity` predicates (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::new(capacity),
                stats: CacheStats::default(),
            }),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Look up a predicate, recording a hit or miss.
    pub fn get(&self, key: &CacheKey) -> Option<Predicate> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        match inner.entries.peek(key).cloned() {
            Some(predicate) => {
                inner.stats.hits += 1;
                tracing::debug!(source = %key.source, "predicate cache hit");
                Some(predicate)
            }
            None => {
                inner.stats.misses += 1;
                tracing::debug!(source = %key.source, "predicate cache miss");
                None
            }
        }
    }

    /// Insert a predicate, evicting the oldest entry when full.
    pub fn insert(&self, key: CacheKey, predicate: Predicate) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);

        if inner.entries.contains(&key) {
            // Keep the first compiled instance and its insertion order
            return;
        }

        if let Some((evicted, _)) = inner.entries.push(key, predicate) {
            inner.stats.evictions += 1;
            tracing::debug!(source = %evicted.source, "predicate cache eviction");
        }
        inner.stats.entries = inner.entries.len();
    }

    /// Drop every entry; counters other than `entries` are kept.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.entries.clear();
        inner.stats.entries = 0;
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .stats
            .clone()
    }
}

impl Default for PredicateCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for PredicateCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredicateCache")
            .field("capacity", &self.capacity)
            .field("stats", &self.stats())
            .finish()
    }
}
