//! Per-record memo for derived values
//!
//! Downstream stages use the cache to avoid re-parsing the same sub-value
//! (a JSON payload, a timestamp) more than once per record. The map is only
//! allocated on first insert and survives `clear()` with its capacity.

use std::any::Any;
use std::collections::HashMap;

/// Lazily allocated typed key/value memo
#[derive(Default)]
pub struct RecordCache {
    entries: Option<HashMap<String, Box<dyn Any + Send>>>,
}

impl RecordCache {
    /// Create an empty cache (no allocation)
    #[inline]
    pub const fn new() -> Self {
        Self { entries: None }
    }

    /// Get a cached value of type `T`
    ///
    /// Returns `None` if the key is missing or holds a different type.
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.entries.as_ref()?.get(key)?.downcast_ref::<T>()
    }

    /// Get a mutable reference to a cached value of type `T`
    pub fn get_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.entries.as_mut()?.get_mut(key)?.downcast_mut::<T>()
    }

    /// Store a value, replacing any previous one under `key`
    pub fn set<T: Any + Send>(&mut self, key: impl Into<String>, value: T) {
        self.entries
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), Box::new(value));
    }

    /// Remove a value, returning whether it existed
    pub fn delete(&mut self, key: &str) -> bool {
        self.entries
            .as_mut()
            .is_some_and(|entries| entries.remove(key).is_some())
    }

    /// Remove all values, keeping the allocation
    pub fn clear(&mut self) {
        if let Some(entries) = self.entries.as_mut() {
            entries.clear();
        }
    }

    /// Number of cached values
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, HashMap::len)
    }

    /// Whether the cache holds nothing
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for RecordCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordCache")
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lazy_allocation() {
        let cache = RecordCache::new();
        assert!(cache.entries.is_none());
        assert!(cache.is_empty());
        assert_eq!(cache.get::<u64>("x"), None);
    }

    #[test]
    fn test_set_get_delete() {
        let mut cache = RecordCache::new();
        cache.set("level", 3u8);
        cache.set("tags", vec!["a".to_string()]);

        assert_eq!(cache.get::<u8>("level"), Some(&3));
        assert_eq!(cache.get::<Vec<String>>("tags").map(Vec::len), Some(1));
        // Wrong type reads as missing
        assert_eq!(cache.get::<u64>("level"), None);

        assert!(cache.delete("level"));
        assert!(!cache.delete("level"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_mut() {
        let mut cache = RecordCache::new();
        cache.set("count", 1u32);
        if let Some(count) = cache.get_mut::<u32>("count") {
            *count += 1;
        }
        assert_eq!(cache.get::<u32>("count"), Some(&2));
    }

    #[test]
    fn test_clear_keeps_allocation() {
        let mut cache = RecordCache::new();
        cache.set("a", 1i32);
        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.entries.is_some());
    }
}
