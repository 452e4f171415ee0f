//! Content-keyed result caching.
//!
//! [`CacheKey`] hashes the input bytes together with the extraction settings,
//! never a path or a timestamp. [`MemoryCache`] gives every key its own
//! [`OnceCell`], so concurrent callers asking for the same key wait for a
//! single computation instead of repeating it.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::ExtractConfig;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// SHA-256 over the document bytes and the settings that shape the output.
    pub fn for_document(bytes: &[u8], config: &ExtractConfig) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hasher.update(format!("{config:?}").as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An in-process get-or-compute store.
#[derive(Debug)]
pub struct MemoryCache<V> {
    cells: Mutex<HashMap<CacheKey, Arc<OnceCell<V>>>>,
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }
}

impl<V: Clone> MemoryCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    fn cell(&self, key: &CacheKey) -> Arc<OnceCell<V>> {
        let mut cells = self
            .cells
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Arc::clone(cells.entry(key.clone()).or_default())
    }

    pub fn get(&self, key: &CacheKey) -> Option<V> {
        self.cell(key).get().cloned()
    }

    /// Return the cached value for `key`, computing it with `compute` if absent.
    ///
    /// At most one `compute` runs per key at a time; others block on it. A
    /// failed computation stores nothing, so the next caller retries.
    pub fn get_or_try_compute<E>(
        &self,
        key: &CacheKey,
        compute: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        self.cell(key).get_or_try_init(compute).cloned()
    }

    /// Seed a value computed elsewhere; an existing value wins.
    pub fn insert(&self, key: &CacheKey, value: V) {
        let _ = self.cell(key).set(value);
    }

    pub fn len(&self) -> usize {
        self.cells
            .lock()
            .map(|cells| cells.values().filter(|c| c.get().is_some()).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    #[test]
    fn test_key_depends_on_content() {
        let config = ExtractConfig::default();
        let a = CacheKey::for_document(b"one", &config);
        let b = CacheKey::for_document(b"one", &config);
        let c = CacheKey::for_document(b"two", &config);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn test_key_depends_on_variant() {
        let plain = CacheKey::for_document(b"doc", &ExtractConfig::default());
        let amount = CacheKey::for_document(b"doc", &ExtractConfig::with_amount());
        assert_ne!(plain, amount);
    }

    #[test]
    fn test_get_or_compute_runs_once() {
        let cache = MemoryCache::new();
        let key = CacheKey::for_document(b"doc", &ExtractConfig::default());
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value: Result<u32, ()> = cache.get_or_try_compute(&key, || {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            });
            assert_eq!(value, Ok(7));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache: MemoryCache<u32> = MemoryCache::new();
        let key = CacheKey::for_document(b"doc", &ExtractConfig::default());

        assert_eq!(cache.get_or_try_compute(&key, || Err("boom")), Err("boom"));
        assert!(cache.get(&key).is_none());
        assert_eq!(cache.get_or_try_compute::<&str>(&key, || Ok(1)), Ok(1));
    }

    #[test]
    fn test_concurrent_callers_share_one_computation() {
        let cache = Arc::new(MemoryCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let key = CacheKey::for_document(b"shared", &ExtractConfig::default());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                let key = key.clone();
                thread::spawn(move || {
                    cache
                        .get_or_try_compute::<()>(&key, || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(std::time::Duration::from_millis(20));
                            Ok(String::from("table"))
                        })
                        .unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), "table");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_insert_keeps_first_value() {
        let cache = MemoryCache::new();
        let key = CacheKey::for_document(b"doc", &ExtractConfig::default());
        cache.insert(&key, 1);
        cache.insert(&key, 2);
        assert_eq!(cache.get(&key), Some(1));
        assert!(!cache.is_empty());
    }
}
