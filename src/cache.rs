//! Generic bounded cache with least-frequently-used eviction.

use std::collections::HashMap;
use std::hash::Hash;

struct CacheEntry<V> {
    value: V,
    frequency: u64,
    last_used: u64,
}

/// A bounded associative cache evicting the least-frequently-used entry.
///
/// `get` and a `put` over an existing key count as uses; when a new key
/// arrives at capacity, the entry with the lowest use count is evicted,
/// least-recently-used first among ties. The logical clock is a simple
/// operation counter, so behavior is fully deterministic.
///
/// The cache is not internally synchronized; callers wrap it in a lock
/// (each index guards its filter cache with a `Mutex`).
pub struct LfuCache<K, V> {
    capacity: usize,
    tick: u64,
    entries: HashMap<K, CacheEntry<V>>,
}

impl<K: Eq + Hash + Clone, V> LfuCache<K, V> {
    /// Create a cache holding at most `capacity` entries.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "LfuCache capacity must be non-zero");
        Self {
            capacity,
            tick: 0,
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries. Frequencies do not survive a clear.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Look up `key`, counting the access.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        self.tick += 1;
        let tick = self.tick;
        self.entries.get_mut(key).map(|entry| {
            entry.frequency += 1;
            entry.last_used = tick;
            &entry.value
        })
    }

    /// Insert or replace `key`.
    ///
    /// Replacing counts as a use of the existing entry. Inserting a new
    /// key at capacity first evicts the minimum-frequency entry
    /// (least-recently-used on ties).
    pub fn put(&mut self, key: K, value: V) {
        self.tick += 1;
        let tick = self.tick;

        if let Some(entry) = self.entries.get_mut(&key) {
            entry.value = value;
            entry.frequency += 1;
            entry.last_used = tick;
            return;
        }

        if self.entries.len() >= self.capacity {
            self.evict();
        }

        self.entries.insert(
            key,
            CacheEntry {
                value,
                frequency: 1,
                last_used: tick,
            },
        );
    }

    fn evict(&mut self) {
        let victim = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| (entry.frequency, entry.last_used))
            .map(|(key, _)| key.clone());

        if let Some(key) = victim {
            self.entries.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_put() {
        let mut cache: LfuCache<String, i32> = LfuCache::new(4);
        assert!(cache.is_empty());

        cache.put("a".into(), 1);
        cache.put("b".into(), 2);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a".into()), Some(&1));
        assert_eq!(cache.get(&"missing".into()), None);
    }

    #[test]
    fn test_put_replaces_value() {
        let mut cache: LfuCache<String, i32> = LfuCache::new(2);
        cache.put("a".into(), 1);
        cache.put("a".into(), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"a".into()), Some(&2));
    }

    #[test]
    fn test_evicts_least_frequent() {
        let mut cache: LfuCache<String, i32> = LfuCache::new(2);
        cache.put("hot".into(), 1);
        cache.put("cold".into(), 2);

        cache.get(&"hot".into());
        cache.get(&"hot".into());

        cache.put("new".into(), 3);

        assert_eq!(cache.get(&"cold".into()), None);
        assert_eq!(cache.get(&"hot".into()), Some(&1));
        assert_eq!(cache.get(&"new".into()), Some(&3));
    }

    #[test]
    fn test_lru_tiebreak_among_minimum_frequency() {
        let mut cache: LfuCache<String, i32> = LfuCache::new(3);
        cache.put("first".into(), 1);
        cache.put("second".into(), 2);
        cache.put("third".into(), 3);

        // Touch "first" so "second" becomes the stalest of the freq-1 pair
        cache.get(&"first".into());
        cache.get(&"third".into());

        cache.put("fourth".into(), 4);

        assert_eq!(cache.get(&"second".into()), None);
        assert_eq!(cache.get(&"first".into()), Some(&1));
        assert_eq!(cache.get(&"third".into()), Some(&3));
        assert_eq!(cache.get(&"fourth".into()), Some(&4));
    }

    #[test]
    fn test_replace_bumps_frequency() {
        let mut cache: LfuCache<String, i32> = LfuCache::new(2);
        cache.put("a".into(), 1);
        cache.put("b".into(), 2);
        cache.put("a".into(), 10); // a now has frequency 2

        cache.put("c".into(), 3); // evicts b

        assert_eq!(cache.get(&"b".into()), None);
        assert_eq!(cache.get(&"a".into()), Some(&10));
    }

    #[test]
    fn test_clear() {
        let mut cache: LfuCache<String, i32> = LfuCache::new(2);
        cache.put("a".into(), 1);
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&"a".into()), None);
    }

    #[test]
    #[should_panic]
    fn test_zero_capacity_panics() {
        let _cache: LfuCache<String, i32> = LfuCache::new(0);
    }
}
