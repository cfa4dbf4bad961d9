//! Explicit time-to-live cache

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

/// Key/value cache where every entry expires `ttl` after it was stored.
///
/// Expired entries are not dropped on lookup: `get_stale` can still return them, which
/// is what callers use as a last-known-good fallback when a refresh fails. Timestamps
/// come from `tokio::time::Instant` so tests can drive expiry with a paused clock.
pub struct TtlCache<K, V> {
    entries: HashMap<K, CacheEntry<V>>,
    ttl: Duration,
}

impl<K: Eq + Hash, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Value for `key` if it is younger than the TTL
    pub fn get(&self, key: &K) -> Option<V> {
        self.entries
            .get(key)
            .filter(|entry| entry.stored_at.elapsed() < self.ttl)
            .map(|entry| entry.value.clone())
    }

    /// Value for `key` regardless of age
    pub fn get_stale(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Store `value`, replacing value and timestamp together
    pub fn insert(&mut self, key: K, value: V) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|entry| entry.value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let mut cache = TtlCache::new(Duration::from_secs(300));
        cache.insert("USD", vec!["BTC-USD"]);

        assert_eq!(cache.get(&"USD"), Some(vec!["BTC-USD"]));

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get(&"USD").is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get(&"USD").is_none());
        assert_eq!(cache.get_stale(&"USD"), Some(vec!["BTC-USD"]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_insert_refreshes_timestamp() {
        let mut cache = TtlCache::new(Duration::from_secs(10));
        cache.insert(1, "old");
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.insert(1, "new");
        tokio::time::advance(Duration::from_secs(8)).await;

        assert_eq!(cache.get(&1), Some("new"));
    }

    #[test]
    fn test_invalidate_and_clear() {
        let mut cache = TtlCache::new(Duration::from_secs(10));
        cache.insert("a", 1);
        cache.insert("b", 2);

        assert_eq!(cache.invalidate(&"a"), Some(1));
        assert!(cache.get_stale(&"a").is_none());
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
