use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use super::CacheStats;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Short-lived memo of idempotent reads.
///
/// A poisoned lock degrades to a miss; the cache is never a source of errors.
#[derive(Debug, Default)]
pub struct ReadCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ReadCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh value for `key`. Expired entries are removed on the way.
    pub fn get(&self, key: &str) -> Option<Value> {
        let now = Utc::now();
        let found = self
            .entries
            .read()
            .ok()
            .and_then(|entries| entries.get(key).cloned());

        match found {
            Some(entry) if entry.is_fresh(now) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value)
            }
            Some(_) => {
                if let Ok(mut entries) = self.entries.write() {
                    if entries.get(key).is_some_and(|entry| !entry.is_fresh(now)) {
                        entries.remove(key);
                    }
                }
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Stores `value` until `now + ttl`, overwriting any previous entry.
    pub fn set(&self, key: impl Into<String>, value: Value, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: Utc::now() + ttl,
        };
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key.into(), entry);
        }
    }

    pub fn delete(&self, key: &str) -> bool {
        self.entries
            .write()
            .is_ok_and(|mut entries| entries.remove(key).is_some())
    }

    /// Removes every key starting with `prefix`. Returns how many went.
    pub fn delete_by_prefix(&self, prefix: &str) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    /// Removes everything. Returns how many entries went.
    pub fn clear(&self) -> usize {
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let removed = entries.len();
        entries.clear();
        removed
    }

    /// Drops expired entries eagerly. `get` already ignores them.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now));
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .entries
            .read()
            .map(|entries| entries.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_set_and_get() {
        let cache = ReadCache::new();
        cache.set("o1|/clients", json!([{"id": 1}]), Duration::seconds(60));

        assert_eq!(cache.get("o1|/clients"), Some(json!([{"id": 1}])));
        assert!(cache.get("o1|/funnels").is_none());

        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[test]
    fn test_expired_entries_are_purged_lazily() {
        let cache = ReadCache::new();
        cache.set("o1|/clients", json!([]), Duration::zero());
        assert_eq!(cache.len(), 1);

        assert!(cache.get("o1|/clients").is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_set_overwrites() {
        let cache = ReadCache::new();
        cache.set("k", json!(1), Duration::seconds(60));
        cache.set("k", json!(2), Duration::seconds(60));

        assert_eq!(cache.get("k"), Some(json!(2)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_delete_by_prefix() {
        let cache = ReadCache::new();
        let ttl = Duration::seconds(60);
        cache.set("o1|/clients", json!([]), ttl);
        cache.set("o1|/clients?page=2", json!([]), ttl);
        cache.set("o1|/clients/4/payments", json!([]), ttl);
        cache.set("o2|/clients", json!([]), ttl);

        assert_eq!(cache.delete_by_prefix("o1|/clients?"), 1);
        assert!(cache.delete("o1|/clients"));
        assert!(!cache.delete("o1|/clients"));

        assert_eq!(cache.keys(), vec!["o1|/clients/4/payments", "o2|/clients"]);
    }

    #[test]
    fn test_purge_and_clear() {
        let cache = ReadCache::new();
        cache.set("stale", json!(null), Duration::zero());
        cache.set("fresh", json!(null), Duration::seconds(60));

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.clear(), 1);
        assert!(cache.is_empty());
    }
}
