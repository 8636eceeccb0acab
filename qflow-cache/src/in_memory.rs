use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::backend::{CacheBackend, CacheError};

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Bounded in-process LRU backend (spec §4.2: "fallback: bounded in-process LRU
/// with size cap and per-entry TTL"), grounded in the teacher's
/// `Arc<RwLock<HashMap<...>>>` session-store shape. Eviction order is tracked with
/// a simple recency `VecDeque`; this is a correctness-first LRU, not a
/// constant-time one, which is adequate for the fallback's role (primary is
/// expected to carry the real traffic).
pub struct InMemoryLru {
    capacity: usize,
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    recency: Arc<RwLock<VecDeque<String>>>,
}

impl InMemoryLru {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Arc::new(RwLock::new(HashMap::new())),
            recency: Arc::new(RwLock::new(VecDeque::new())),
        }
    }

    fn touch(&self, key: &str) {
        let mut recency = self.recency.write().unwrap();
        recency.retain(|k| k != key);
        recency.push_back(key.to_string());
    }

    fn evict_if_needed(&self) {
        let mut entries = self.entries.write().unwrap();
        let mut recency = self.recency.write().unwrap();
        while entries.len() > self.capacity {
            if let Some(oldest) = recency.pop_front() {
                entries.remove(&oldest);
            } else {
                break;
            }
        }
    }
}

#[async_trait]
impl CacheBackend for InMemoryLru {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let expired = {
            let entries = self.entries.read().unwrap();
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => false,
                Some(_) => true,
                None => return Ok(None),
            }
        };
        if expired {
            self.entries.write().unwrap().remove(key);
            self.recency.write().unwrap().retain(|k| k != key);
            return Ok(None);
        }
        self.touch(key);
        Ok(self.entries.read().unwrap().get(key).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.entries
            .write()
            .unwrap()
            .insert(key.to_string(), Entry { value, expires_at: Instant::now() + ttl });
        self.touch(key);
        self.evict_if_needed();
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().unwrap().remove(key);
        self.recency.write().unwrap().retain(|k| k != key);
        Ok(())
    }

    async fn clear_pattern(&self, prefix: &str) -> Result<u64, CacheError> {
        let mut entries = self.entries.write().unwrap();
        let to_remove: Vec<String> =
            entries.keys().filter(|k| k.starts_with(prefix)).cloned().collect();
        for key in &to_remove {
            entries.remove(key);
        }
        let mut recency = self.recency.write().unwrap();
        recency.retain(|k| !to_remove.contains(k));
        Ok(to_remove.len() as u64)
    }

    async fn incr(&self, key: &str, by: i64, ttl: Duration) -> Result<i64, CacheError> {
        let mut entries = self.entries.write().unwrap();
        let current = entries
            .get(key)
            .filter(|e| e.expires_at > Instant::now())
            .and_then(|e| e.value.parse::<i64>().ok())
            .unwrap_or(0);
        let next = current + by;
        entries.insert(
            key.to_string(),
            Entry { value: next.to_string(), expires_at: Instant::now() + ttl },
        );
        drop(entries);
        self.touch(key);
        self.evict_if_needed();
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        if let Some(entry) = self.entries.write().unwrap().get_mut(key) {
            entry.expires_at = Instant::now() + ttl;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_then_get_within_ttl_returns_value() {
        let cache = InMemoryLru::new(10);
        cache.set("k", "v".into(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn expired_entry_is_treated_as_miss() {
        let cache = InMemoryLru::new(10);
        cache.set("k", "v".into(), Duration::from_millis(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn capacity_cap_evicts_least_recently_used() {
        let cache = InMemoryLru::new(2);
        cache.set("a", "1".into(), Duration::from_secs(60)).await.unwrap();
        cache.set("b", "2".into(), Duration::from_secs(60)).await.unwrap();
        cache.get("a").await.unwrap(); // touch a, making b the LRU victim
        cache.set("c", "3".into(), Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.get("b").await.unwrap(), None);
        assert_eq!(cache.get("a").await.unwrap(), Some("1".to_string()));
        assert_eq!(cache.get("c").await.unwrap(), Some("3".to_string()));
    }

    #[tokio::test]
    async fn incr_accumulates_and_resets_ttl() {
        let cache = InMemoryLru::new(10);
        assert_eq!(cache.incr("ctr", 1, Duration::from_secs(60)).await.unwrap(), 1);
        assert_eq!(cache.incr("ctr", 2, Duration::from_secs(60)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn clear_pattern_removes_matching_prefix_only() {
        let cache = InMemoryLru::new(10);
        cache.set("schema:1", "a".into(), Duration::from_secs(60)).await.unwrap();
        cache.set("schema:2", "b".into(), Duration::from_secs(60)).await.unwrap();
        cache.set("query:1", "c".into(), Duration::from_secs(60)).await.unwrap();
        let removed = cache.clear_pattern("schema:").await.unwrap();
        assert_eq!(removed, 2);
        assert_eq!(cache.get("query:1").await.unwrap(), Some("c".to_string()));
    }
}
