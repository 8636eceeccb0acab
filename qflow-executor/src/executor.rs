use std::sync::Arc;
use std::time::Duration;

use qflow_core::{DataSource, QueryResult};
use tokio_util::sync::CancellationToken;

use crate::backend::{BackendError, ExecutorBackend};

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("query exceeded timeout of {0:?}")]
    Timeout(Duration),
    #[error("query cancelled")]
    Cancelled,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Runs read-only queries against a pluggable `ExecutorBackend`, enforcing
/// the timeout and row-cap contracts independent of what any particular
/// backend implementation does or forgets to do (spec §4.5).
pub struct QueryExecutor<B: ExecutorBackend> {
    backend: Arc<B>,
    timeout: Duration,
    max_rows: usize,
}

impl<B: ExecutorBackend> QueryExecutor<B> {
    pub fn new(backend: Arc<B>, timeout: Duration, max_rows: usize) -> Self {
        Self { backend, timeout, max_rows }
    }

    /// Executes `sql` against `data_source`, racing the backend call against
    /// `timeout` and `cancel`. Row truncation beyond `max_rows` is enforced
    /// here too, in case a backend under-reports it.
    pub async fn execute(
        &self,
        data_source: &DataSource,
        sql: &str,
        cancel: &CancellationToken,
    ) -> Result<QueryResult, ExecutorError> {
        let call = self.backend.query(data_source, sql, self.max_rows);

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ExecutorError::Cancelled),
            result = tokio::time::timeout(self.timeout, call) => result,
        };

        let mut result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(backend_err)) => return Err(ExecutorError::Backend(backend_err)),
            Err(_elapsed) => return Err(ExecutorError::Timeout(self.timeout)),
        };

        if result.rows.len() > self.max_rows {
            result.rows.truncate(self.max_rows);
            result.row_count = self.max_rows;
            result.truncated = true;
        }
        Ok(result)
    }
}
