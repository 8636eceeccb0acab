use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub backend_failures: u64,
}

/// One key-value backend. Implementations back either the primary (external,
/// lock-free) or fallback (bounded in-process LRU) tier of [`crate::LayeredCache`].
/// All operations are async to accommodate a network-backed primary even though
/// the in-process fallback resolves them immediately.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    async fn set(&self, key: &str, value: String, ttl: std::time::Duration) -> Result<(), CacheError>;
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
    async fn clear_pattern(&self, prefix: &str) -> Result<u64, CacheError>;
    /// Atomically increments a counter entry (used for rate/quota-adjacent
    /// counting that shares the cache backend) and returns the new value.
    async fn incr(&self, key: &str, by: i64, ttl: std::time::Duration) -> Result<i64, CacheError>;
    async fn expire(&self, key: &str, ttl: std::time::Duration) -> Result<(), CacheError>;
}
