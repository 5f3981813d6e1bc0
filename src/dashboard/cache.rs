//! Explicit memoization of dashboard queries.

use std::collections::hash_map::Entry;
use std::hash::Hash;

use rustc_hash::FxHashMap;

/// Results of earlier queries keyed by query identity and arguments
///
/// Failed computations are not stored, so the next lookup retries them.
#[derive(Debug)]
pub struct QueryCache<K, V> {
    entries: FxHashMap<K, V>,
}

impl<K, V> Default for QueryCache<K, V> {
    fn default() -> Self {
        Self {
            entries: FxHashMap::default(),
        }
    }
}

impl<K: Eq + Hash, V> QueryCache<K, V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value for `key`, computing and storing it on a miss
    pub fn get_or_try_insert_with<E, F>(&mut self, key: K, compute: F) -> Result<&V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        match self.entries.entry(key) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let value = compute()?;
                Ok(entry.insert(value))
            }
        }
    }

    /// Forget every stored result
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_hit_skips_computation() {
        let calls = Cell::new(0);
        let mut cache: QueryCache<i32, String> = QueryCache::new();
        let compute = || {
            calls.set(calls.get() + 1);
            Ok::<_, ()>("value".to_string())
        };

        assert_eq!(cache.get_or_try_insert_with(1, compute).unwrap(), "value");
        assert_eq!(cache.get_or_try_insert_with(1, compute).unwrap(), "value");
        assert_eq!(calls.get(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let mut cache: QueryCache<&str, u8> = QueryCache::new();
        assert_eq!(cache.get_or_try_insert_with("k", || Err("boom")), Err("boom"));
        assert!(cache.is_empty());
        assert_eq!(cache.get_or_try_insert_with("k", || Ok::<_, &str>(7)), Ok(&7));
    }

    #[test]
    fn test_clear() {
        let mut cache: QueryCache<u8, u8> = QueryCache::new();
        cache.get_or_try_insert_with(1, || Ok::<_, ()>(1)).unwrap();
        cache.get_or_try_insert_with(2, || Ok::<_, ()>(2)).unwrap();
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }
}
