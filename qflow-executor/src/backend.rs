use async_trait::async_trait;
use qflow_core::{DataSource, QueryResult};

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("query failed: {0}")]
    Query(String),
}

/// Narrow, swappable interface a concrete database driver implements. The
/// executor never sees driver-specific types, only `QueryResult` rows already
/// converted to `CellValue` (spec §4.5: "pluggable per `DataSourceKind`").
#[async_trait]
pub trait ExecutorBackend: Send + Sync {
    async fn open(&self, data_source: &DataSource) -> Result<(), BackendError>;

    /// Runs `sql` against `data_source`, capping the returned rows at
    /// `max_rows` (the backend itself is responsible for truncating, since
    /// only it can stop fetching early).
    async fn query(&self, data_source: &DataSource, sql: &str, max_rows: usize) -> Result<QueryResult, BackendError>;

    async fn close(&self, data_source: &DataSource) -> Result<(), BackendError>;
}
