//! Bounded string-keyed cache with least-recently-used eviction.
//!
//! Used to memoize derived artifacts (diffs, rendered text) keyed by snapshot
//! and file identity, e.g. `"{from}:{to}:{path}"`. Keys are chosen by the caller.

use std::num::NonZeroUsize;

pub struct LruCache<V> {
    inner: ::lru::LruCache<String, V>,
}

impl<V> LruCache<V> {
    /// A `max` of zero is treated as one.
    pub fn new(max: usize) -> Self {
        let cap = NonZeroUsize::new(max).unwrap_or(NonZeroUsize::MIN);
        Self { inner: ::lru::LruCache::new(cap) }
    }

    /// Returns the value and marks it most recently used.
    pub fn get(&mut self, key: &str) -> Option<&V> {
        self.inner.get(key)
    }

    /// Inserts or replaces `key`, refreshing its recency. Evicts the least
    /// recently used entry when the cache is over capacity.
    pub fn set(&mut self, key: impl Into<String>, value: V) {
        let key = key.into();
        if let Some((evicted, _)) = self.inner.push(key.clone(), value) {
            if evicted != key {
                tracing::trace!(key = %evicted, "lru evict");
            }
        }
    }

    /// Membership test; does not touch recency.
    pub fn has(&self, key: &str) -> bool {
        self.inner.contains(key)
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn max(&self) -> usize {
        self.inner.cap().get()
    }
}

impl<V: Clone> LruCache<V> {
    /// Returns a clone of the cached value, computing and storing it on a miss.
    pub fn get_or_insert_with<F: FnOnce() -> V>(&mut self, key: &str, f: F) -> V {
        if let Some(v) = self.inner.get(key) {
            return v.clone();
        }
        let v = f();
        self.set(key, v.clone());
        v
    }
}
