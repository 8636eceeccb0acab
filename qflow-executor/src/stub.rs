use async_trait::async_trait;
use qflow_core::{CellValue, DataSource, QueryResult, Row};
use std::sync::Mutex;

use crate::backend::{BackendError, ExecutorBackend};

/// Test double that returns a fixed, pre-seeded `QueryResult` for every query
/// and records the SQL it was asked to run, so orchestrator/agent tests never
/// need a real database connection.
pub struct StubBackend {
    result: QueryResult,
    queries: Mutex<Vec<String>>,
}

impl StubBackend {
    pub fn new(result: QueryResult) -> Self {
        Self { result, queries: Mutex::new(Vec::new()) }
    }

    pub fn empty() -> Self {
        Self::new(QueryResult { rows: Vec::new(), row_count: 0, schema: Vec::new(), truncated: false })
    }

    pub fn single_row(columns: &[(&str, CellValue)]) -> Self {
        let row: Row = columns.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        let schema = columns.iter().map(|(k, _)| k.to_string()).collect();
        Self::new(QueryResult { rows: vec![row], row_count: 1, schema, truncated: false })
    }

    pub fn queries_seen(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExecutorBackend for StubBackend {
    async fn open(&self, _data_source: &DataSource) -> Result<(), BackendError> {
        Ok(())
    }

    async fn query(&self, _data_source: &DataSource, sql: &str, max_rows: usize) -> Result<QueryResult, BackendError> {
        self.queries.lock().unwrap().push(sql.to_string());
        let mut result = self.result.clone();
        if result.rows.len() > max_rows {
            result.rows.truncate(max_rows);
            result.row_count = max_rows;
            result.truncated = true;
        }
        Ok(result)
    }

    async fn close(&self, _data_source: &DataSource) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Test double that always fails to open a connection.
pub struct AlwaysFailsBackend;

#[async_trait]
impl ExecutorBackend for AlwaysFailsBackend {
    async fn open(&self, _data_source: &DataSource) -> Result<(), BackendError> {
        Err(BackendError::Connection("stub always fails".into()))
    }

    async fn query(&self, _data_source: &DataSource, _sql: &str, _max_rows: usize) -> Result<QueryResult, BackendError> {
        Err(BackendError::Query("stub always fails".into()))
    }

    async fn close(&self, _data_source: &DataSource) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Test double that never returns, to exercise the executor's timeout path.
pub struct HangingBackend;

#[async_trait]
impl ExecutorBackend for HangingBackend {
    async fn open(&self, _data_source: &DataSource) -> Result<(), BackendError> {
        Ok(())
    }

    async fn query(&self, _data_source: &DataSource, _sql: &str, _max_rows: usize) -> Result<QueryResult, BackendError> {
        std::future::pending::<()>().await;
        unreachable!()
    }

    async fn close(&self, _data_source: &DataSource) -> Result<(), BackendError> {
        Ok(())
    }
}
