//! In-memory cache for storing key-value pairs.
//!
//! Uses moka's concurrent cache implementation.

use std::time::Duration;

use moka::sync::Cache;

/// Thread-safe in-memory cache.
///
/// Unbounded by default. With [`MemCache::with_time_to_idle`] an entry is
/// dropped once nobody has read or written it for the given duration.
#[derive(Clone)]
pub struct MemCache<K, V> {
    entries: Cache<K, V>,
}

impl<K, V> MemCache<K, V>
where
    K: std::hash::Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Allocate a new [`MemCache`].
    pub fn new() -> Self {
        Self {
            entries: Cache::builder().build(),
        }
    }

    pub fn with_time_to_idle(idle: Duration) -> Self {
        Self {
            entries: Cache::builder().time_to_idle(idle).build(),
        }
    }

    pub fn get(
        &self,
        key: &K,
    ) -> Option<V> {
        self.entries.get(key)
    }

    pub fn set(
        &self,
        key: K,
        value: V,
    ) {
        self.entries.insert(key, value);
    }

    /// Get the value for `key`, inserting the result of `init` if absent.
    ///
    /// Concurrent callers for the same key observe one and the same value.
    pub fn get_or_insert_with(
        &self,
        key: K,
        init: impl FnOnce() -> V,
    ) -> V {
        self.entries.get_with(key, init)
    }

    pub fn remove(
        &self,
        key: &K,
    ) {
        self.entries.invalidate(key);
    }

    /// Return an iterator over the entries of the cache.
    pub fn iter(&self) -> moka::sync::Iter<'_, K, V> {
        self.entries.iter()
    }
}

impl<K, V> Default for MemCache<K, V>
where
    K: std::hash::Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}
