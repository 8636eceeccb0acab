//! Layered Cache (C2): a TTL cache for schemas, query results, and LLM responses,
//! fronting an external primary backend with a bounded in-process LRU fallback.

mod backend;
mod in_memory;
mod key;
mod layered;
mod namespace;

pub use backend::{CacheBackend, CacheError, CacheStats};
pub use in_memory::InMemoryLru;
pub use key::{ai_key, normalize_sql, query_key, schema_key};
pub use layered::{CACHE_CALL_BUDGET, LayeredCache};
pub use namespace::NamespacedCache;
