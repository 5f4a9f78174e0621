//! Bounded LRU cache of query results keyed by exact coordinate pair.
//!
//! The mutex only guards cache bookkeeping. Callers look up, release the
//! lock, run the query, then insert; the lock is never held across a store
//! lookup.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use common::config::CachePolicy;
use common::QueryResult;
use lru::LruCache;
use serde::Serialize;

/// Exact (lat, lon) pair, compared bit-for-bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CoordKey {
    lat_bits: u64,
    lon_bits: u64,
}

impl CoordKey {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat_bits: lat.to_bits(),
            lon_bits: lon.to_bits(),
        }
    }
}

/// What a cached result was computed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStamp {
    pub generation: u64,
    /// Minutes since the Unix epoch (UTC).
    pub minute: i64,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    result: QueryResult,
    stamp: CacheStamp,
}

/// Point-in-time cache counters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CacheStats {
    pub len: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
}

pub struct ResultCache {
    inner: Mutex<LruCache<CoordKey, CacheEntry>>,
    policy: CachePolicy,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize, policy: CachePolicy) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            policy,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up `key`, marking it most recently used on a hit.
    ///
    /// Under [`CachePolicy::PerGeneration`] an entry whose stamp differs
    /// from `stamp` is dropped and reported as a miss.
    pub fn get(&self, key: &CoordKey, stamp: CacheStamp) -> Option<QueryResult> {
        let found = self.lookup(key, stamp);
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    fn lookup(&self, key: &CoordKey, stamp: CacheStamp) -> Option<QueryResult> {
        let mut cache = self.inner.lock().ok()?;
        let entry = cache.get(key)?;
        if self.policy == CachePolicy::PerGeneration && entry.stamp != stamp {
            cache.pop(key);
            return None;
        }
        Some(entry.result.clone())
    }

    /// Insert or overwrite `key`, evicting the least recently used entry when full.
    pub fn insert(&self, key: CoordKey, stamp: CacheStamp, result: QueryResult) {
        if let Ok(mut cache) = self.inner.lock() {
            cache.put(key, CacheEntry { result, stamp });
        }
    }

    #[cfg(test)]
    fn contains(&self, key: &CoordKey) -> bool {
        self.inner
            .lock()
            .map(|c| c.contains(key))
            .unwrap_or(false)
    }

    fn len(&self) -> usize {
        self.inner.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn stats(&self) -> CacheStats {
        let (len, capacity) = self
            .inner
            .lock()
            .map(|c| (c.len(), c.cap().get()))
            .unwrap_or((0, 0));
        CacheStats {
            len,
            capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("len", &self.len())
            .field("policy", &self.policy)
            .finish()
    }
}
