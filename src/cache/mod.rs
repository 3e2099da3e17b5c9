//! Bounded memoization for network lookups.
//!
//! Every recipe fetch and feedstock-name lookup goes through a
//! [`LookupCache`] so a crawl never issues the same request twice. Entries are
//! evicted least-recently-used once the capacity is reached; within one run a
//! hit is always value-equal to a fresh fetch.
//!
//! Negative results are cached as well: callers store `Option<V>` and a cached
//! `None` short-circuits the request exactly like a cached value.

use std::hash::Hash;
use std::num::NonZeroUsize;

use lru::LruCache;
use tracing::debug;

/// LRU cache with hit/miss statistics.
#[derive(Debug)]
pub struct LookupCache<K: Hash + Eq, V> {
    name: &'static str,
    entries: LruCache<K, V>,
    hits: usize,
    misses: usize,
}

impl<K: Hash + Eq, V: Clone> LookupCache<K, V> {
    /// Create a cache holding at most `capacity` entries.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(name: &'static str, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            name,
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a key, refreshing its recency on a hit.
    pub fn get(&mut self, key: &K) -> Option<V> {
        match self.entries.get(key) {
            Some(value) => {
                self.hits += 1;
                debug!(cache = self.name, "cache hit");
                Some(value.clone())
            }
            None => {
                self.misses += 1;
                debug!(cache = self.name, "cache miss");
                None
            }
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.entries.put(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// (hits, misses)
    pub fn stats(&self) -> (usize, usize) {
        (self.hits, self.misses)
    }

    /// Hit rate as a percentage.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}
