//! A bounded, LRU-evicting, single-flight cache.
//!
//! A `DashMap::entry(..).or_try_insert_with(..)` gives at-most-one loader
//! invocation per key, because the shard holding that key is locked for
//! the duration of the closure — the same trick a `DashMap`-backed probe
//! cache for `tsconfig.json`/`package.json` lookups would use. `PackageCache`
//! is keyed by filesystem path (the local resolver) or `name@version` (the
//! registry resolver), bounded with LRU eviction, and memoizes a loader's
//! error so repeated lookups of an unresolvable package don't retry on
//! every caller.

use std::collections::VecDeque;
use std::hash::Hash;
use std::sync::Arc;

use anyhow::{anyhow, Error, Result};
use dashmap::DashMap;
use parking_lot::Mutex;

#[derive(Clone)]
enum CacheEntry<V> {
    Loaded(Arc<V>),
    /// The loader failed; memoized so concurrent/subsequent lookups don't
    /// thunder into the same failing load. Cleared by `invalidate`.
    Errored(Arc<String>),
}

/// Bounded, single-flight cache of `K -> V`, used for parsed manifests keyed
/// by canonical filesystem path (the local/workspace resolver) or by
/// `name@version` (the registry resolver).
pub struct PackageCache<K, V> {
    entries: DashMap<K, CacheEntry<V>>,
    // Most-recently-used keys at the back. Guarded separately from `entries`
    // since eviction order isn't safety-critical the way entry access is.
    order: Mutex<VecDeque<K>>,
    capacity: usize,
}

impl<K, V> PackageCache<K, V>
where
    K: Eq + Hash + Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            order: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(usize::MAX)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the cached value for `key`, loading it with `loader` if
    /// absent. At most one invocation of `loader` runs per key at a time;
    /// concurrent callers for the same key rendezvous on the `DashMap`
    /// shard's internal lock and observe the first completion.
    pub fn get_or_load(&self, key: K, loader: impl FnOnce() -> Result<V>) -> Result<Arc<V>> {
        let entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| match loader() {
                Ok(v) => CacheEntry::Loaded(Arc::new(v)),
                Err(e) => CacheEntry::Errored(Arc::new(e.to_string())),
            })
            .clone();

        self.touch(key);
        self.evict_over_capacity();

        match entry {
            CacheEntry::Loaded(v) => Ok(v),
            CacheEntry::Errored(msg) => Err(anyhow!("{}", msg)),
        }
    }

    /// Forces a fresh load on the next `get_or_load`, regardless of whether
    /// the previous load succeeded or was memoized as an error.
    pub fn invalidate(&self, key: &K) {
        self.entries.remove(key);
        self.order.lock().retain(|k| k != key);
    }

    pub fn invalidate_all(&self) {
        self.entries.clear();
        self.order.lock().clear();
    }

    fn touch(&self, key: K) {
        let mut order = self.order.lock();
        order.retain(|k| k != &key);
        order.push_back(key);
    }

    fn evict_over_capacity(&self) {
        if self.capacity == usize::MAX {
            return;
        }
        let mut order = self.order.lock();
        while self.entries.len() > self.capacity {
            let Some(oldest) = order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }
}

/// Convenience alias for the `name@version` registry cache key shape.
pub fn registry_key(name: &str, version: &str) -> String {
    format!("{name}@{version}")
}
