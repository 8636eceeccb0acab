use std::time::Duration;

use serde::{Serialize, de::DeserializeOwned};

use crate::key::{ai_key, query_key, schema_key};
use crate::layered::LayeredCache;

/// The three logical namespaces of spec §4.2, sharing one [`LayeredCache`]
/// backend but with their own key construction and TTL.
pub struct NamespacedCache {
    cache: LayeredCache,
    schema_ttl: Duration,
    query_ttl: Duration,
    ai_ttl: Duration,
}

impl NamespacedCache {
    pub fn new(cache: LayeredCache, schema_ttl_hours: i64, query_ttl_hours: i64, ai_ttl_hours: i64) -> Self {
        Self {
            cache,
            schema_ttl: Duration::from_secs((schema_ttl_hours.max(0) as u64) * 3600),
            query_ttl: Duration::from_secs((query_ttl_hours.max(0) as u64) * 3600),
            ai_ttl: Duration::from_secs((ai_ttl_hours.max(0) as u64) * 3600),
        }
    }

    pub async fn get_schema<T: DeserializeOwned>(&self, data_source_id: &str) -> Option<T> {
        let raw = self.cache.get(&schema_key(data_source_id)).await?;
        serde_json::from_str(&raw).ok()
    }

    pub async fn set_schema<T: Serialize>(&self, data_source_id: &str, value: &T) {
        if let Ok(raw) = serde_json::to_string(value) {
            self.cache.set(&schema_key(data_source_id), raw, self.schema_ttl).await;
        }
    }

    /// Invalidates the schema cache entry for a data source whose fingerprint has
    /// changed (spec §4.2: "invalidated on fingerprint change").
    pub async fn invalidate_schema(&self, data_source_id: &str) {
        self.cache.delete(&schema_key(data_source_id)).await;
    }

    pub async fn get_query_result<T: DeserializeOwned>(&self, data_source_id: &str, sql: &str) -> Option<T> {
        let raw = self.cache.get(&query_key(data_source_id, sql)).await?;
        serde_json::from_str(&raw).ok()
    }

    pub async fn set_query_result<T: Serialize>(&self, data_source_id: &str, sql: &str, value: &T) {
        if let Ok(raw) = serde_json::to_string(value) {
            self.cache.set(&query_key(data_source_id, sql), raw, self.query_ttl).await;
        }
    }

    pub async fn get_ai_response(
        &self,
        prompt: &str,
        context_fingerprint: &str,
        conversation_id: &str,
    ) -> Option<String> {
        self.cache.get(&ai_key(prompt, context_fingerprint, conversation_id)).await
    }

    pub async fn set_ai_response(
        &self,
        prompt: &str,
        context_fingerprint: &str,
        conversation_id: &str,
        response: String,
    ) {
        self.cache
            .set(&ai_key(prompt, context_fingerprint, conversation_id), response, self.ai_ttl)
            .await;
    }

    pub fn stats(&self) -> crate::backend::CacheStats {
        self.cache.stats()
    }
}
