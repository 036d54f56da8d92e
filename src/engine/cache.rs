use std::hash::Hash;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

/// Per-key cache whose entries go stale after a fixed TTL.
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: DashMap<K, (Instant, V)>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let entry = self.entries.get(key)?;
        let (stored_at, value) = entry.value();
        if stored_at.elapsed() < self.ttl {
            Some(value.clone())
        } else {
            None
        }
    }

    pub fn insert(&self, key: K, value: V) {
        self.entries.insert(key, (Instant::now(), value));
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
    use std::time::Duration;

    use super::TtlCache;

    #[tokio::test]
    async fn entries_expire_after_ttl() {
        let cache = TtlCache::new(Duration::from_millis(50));
        cache.insert("30d", 7);
        assert_eq!(cache.get(&"30d"), Some(7));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(cache.get(&"30d"), None);
    }

    #[tokio::test]
    async fn reinsert_refreshes_the_entry() {
        let cache = TtlCache::new(Duration::from_millis(50));
        cache.insert("7d", 1);
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(cache.get(&"7d"), None);

        cache.insert("7d", 2);
        assert_eq!(cache.get(&"7d"), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn zero_ttl_never_serves() {
        let cache = TtlCache::new(Duration::ZERO);
        cache.insert("all", 3);
        assert_eq!(cache.get(&"all"), None);
    }
}
