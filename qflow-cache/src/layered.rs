use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::warn;

use crate::backend::{CacheBackend, CacheError, CacheStats};

/// Upper bound on how long a cache round-trip may take before orchestration
/// treats it as a miss (spec §4.2: "Cache set/get must never block orchestration
/// beyond a short budget (≤ 50 ms)").
pub const CACHE_CALL_BUDGET: Duration = Duration::from_millis(50);

/// Fronts a primary backend with an in-process fallback. On primary failure or
/// timeout, transparently serves the fallback and counts the failure for C11.
/// Concurrent readers/writers are safe; last-write-wins; TTL is authoritative
/// (spec §5).
pub struct LayeredCache {
    primary: Option<Arc<dyn CacheBackend>>,
    fallback: Arc<dyn CacheBackend>,
    stats: RwLock<CacheStats>,
}

impl LayeredCache {
    pub fn new(primary: Option<Arc<dyn CacheBackend>>, fallback: Arc<dyn CacheBackend>) -> Self {
        Self { primary, fallback, stats: RwLock::new(CacheStats::default()) }
    }

    pub fn fallback_only(fallback: Arc<dyn CacheBackend>) -> Self {
        Self::new(None, fallback)
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.read().unwrap().clone()
    }

    async fn with_primary_then_fallback<T, F, Fut>(&self, op: F) -> T
    where
        F: Fn(Arc<dyn CacheBackend>) -> Fut,
        Fut: std::future::Future<Output = Result<T, CacheError>>,
        T: Default,
    {
        if let Some(primary) = &self.primary {
            match tokio::time::timeout(CACHE_CALL_BUDGET, op(primary.clone())).await {
                Ok(Ok(value)) => return value,
                Ok(Err(err)) => {
                    warn!(error = %err, "cache primary failed, falling back");
                    self.stats.write().unwrap().backend_failures += 1;
                }
                Err(_elapsed) => {
                    warn!("cache primary timed out, falling back");
                    self.stats.write().unwrap().backend_failures += 1;
                }
            }
        }
        op(self.fallback.clone()).await.unwrap_or_default()
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        let key = key.to_string();
        let result = self
            .with_primary_then_fallback(move |backend| {
                let key = key.clone();
                async move { backend.get(&key).await }
            })
            .await;
        let mut stats = self.stats.write().unwrap();
        if result.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        result
    }

    pub async fn set(&self, key: &str, value: String, ttl: Duration) {
        let key = key.to_string();
        self.with_primary_then_fallback(move |backend| {
            let key = key.clone();
            let value = value.clone();
            async move { backend.set(&key, value, ttl).await.map(|_| Some(())) }
        })
        .await;
    }

    pub async fn delete(&self, key: &str) {
        let key = key.to_string();
        self.with_primary_then_fallback(move |backend| {
            let key = key.clone();
            async move { backend.delete(&key).await.map(|_| Some(())) }
        })
        .await;
    }

    pub async fn clear_pattern(&self, prefix: &str) -> u64 {
        let prefix = prefix.to_string();
        self.with_primary_then_fallback(move |backend| {
            let prefix = prefix.clone();
            async move { backend.clear_pattern(&prefix).await.map(Some) }
        })
        .await
        .unwrap_or(0)
    }

    pub async fn incr(&self, key: &str, by: i64, ttl: Duration) -> i64 {
        let key = key.to_string();
        self.with_primary_then_fallback(move |backend| {
            let key = key.clone();
            async move { backend.incr(&key, by, ttl).await.map(Some) }
        })
        .await
        .unwrap_or(0)
    }
}
