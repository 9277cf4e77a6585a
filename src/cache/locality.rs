//! Locality-based eviction tracking
//!
//! When full, the entry whose key lies farthest from the most recently
//! accessed key is evicted. Playback reads sequentially, so distance from
//! the read head is a good stand-in for "least likely to be needed".

use std::collections::HashMap;

/// Bounded map from chunk offset to value
pub struct LocalityMap<V> {
    entries: HashMap<u64, V>,
    capacity: usize,
    /// Key of the last `get`, if any
    last_key: Option<u64>,
}

impl<V: Clone> LocalityMap<V> {
    /// Create a map holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        LocalityMap {
            entries: HashMap::with_capacity(capacity),
            capacity: capacity.max(1),
            last_key: None,
        }
    }

    /// Look up `key`, recording it as the current access point
    pub fn get(&mut self, key: u64) -> Option<V> {
        self.last_key = Some(key);
        self.entries.get(&key).cloned()
    }

    /// Insert a value, returning the key evicted to make room
    pub fn insert(&mut self, key: u64, value: V) -> Option<u64> {
        let evicted = if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity
        {
            self.evict_farthest(self.last_key.unwrap_or(key))
        } else {
            None
        };

        self.entries.insert(key, value);
        evicted
    }

    fn evict_farthest(&mut self, from: u64) -> Option<u64> {
        let victim = self
            .entries
            .keys()
            .copied()
            .max_by_key(|&k| (k.abs_diff(from), k))?;
        self.entries.remove(&victim);
        Some(victim)
    }

    /// Check if a key is present without counting as an access
    pub fn contains(&self, key: u64) -> bool {
        self.entries.contains_key(&key)
    }

    /// Get count of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_within_capacity() {
        let mut map = LocalityMap::new(3);

        assert_eq!(map.insert(0, "a"), None);
        assert_eq!(map.insert(10, "b"), None);
        assert_eq!(map.insert(20, "c"), None);

        assert_eq!(map.len(), 3);
        assert_eq!(map.get(10), Some("b"));
    }

    #[test]
    fn test_evicts_farthest_from_last_access() {
        let mut map = LocalityMap::new(3);
        map.insert(0, "a");
        map.insert(10, "b");
        map.insert(20, "c");

        // Reading near the end: the start of the file goes first.
        map.get(20);
        assert_eq!(map.insert(30, "d"), Some(0));
        assert!(!map.contains(0));

        // Seek back: the far end goes first.
        map.get(10);
        assert_eq!(map.insert(5, "e"), Some(30));
        assert_eq!(map.len(), 3);
    }

    #[test]
    fn test_miss_counts_as_access() {
        let mut map = LocalityMap::new(2);
        map.insert(0, "a");
        map.insert(100, "b");

        assert_eq!(map.get(90), None);
        assert_eq!(map.insert(90, "c"), Some(0));
        assert!(map.contains(100));
    }

    #[test]
    fn test_replace_does_not_evict() {
        let mut map = LocalityMap::new(2);
        map.insert(0, "a");
        map.insert(10, "b");

        assert_eq!(map.insert(10, "c"), None);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(10), Some("c"));
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut map = LocalityMap::new(4);
        for (i, key) in [7u64, 3, 9, 1, 12, 0, 5, 30, 2, 8].iter().enumerate() {
            map.get(*key);
            map.insert(*key, i);
            assert!(map.len() <= map.capacity());
        }
        assert_eq!(map.len(), 4);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut map = LocalityMap::new(0);
        map.insert(1, "a");
        map.insert(2, "b");
        assert_eq!(map.len(), 1);
    }
}
