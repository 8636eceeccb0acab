use async_trait::async_trait;
use qflow_core::{ClassifiedError, Stage, WorkflowState};
use qflow_executor::{ExecutorBackend, ExecutorError, QueryExecutor};
use qflow_recovery::{classify, ClassificationContext};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::agent::Agent;
use crate::deps::AgentDeps;

/// Invokes the query executor (C5) with the configured timeout/row cap and
/// classifies any executor-level failure (spec §4.7.d).
pub struct QueryExecutorAgent {
    pub data_source: qflow_core::DataSource,
    pub cancel: CancellationToken,
}

#[async_trait]
impl<B: ExecutorBackend> Agent<B> for QueryExecutorAgent {
    async fn run(&self, mut state: WorkflowState, deps: &AgentDeps<B>) -> Result<WorkflowState, ClassifiedError> {
        let context = ClassificationContext { stage: Some("query_executing".into()) };
        let sql = state.sql_query.clone().ok_or_else(|| classify("no sql_query to execute", &context))?;

        state
            .transition_to(Stage::QueryExecuting)
            .map_err(|e| classify(&e.to_string(), &ClassificationContext::default()))?;

        let executor = QueryExecutor::new(
            deps.executor_backend.clone(),
            Duration::from_secs(deps.config.default_timeout_sec),
            deps.config.default_max_rows,
        );

        let result = executor.execute(&self.data_source, &sql, &self.cancel).await.map_err(|e| match e {
            ExecutorError::Timeout(_) => classify("query timed out", &ClassificationContext { stage: Some("timeout".into()) }),
            ExecutorError::Cancelled => classify("query execution cancelled", &context),
            ExecutorError::Backend(backend_err) => classify(&format!("execution failed: {backend_err}"), &context),
        })?;

        state.query_result = Some(result);
        state
            .transition_to(Stage::QueryExecuted)
            .map_err(|e| classify(&e.to_string(), &ClassificationContext::default()))?;
        state
            .set_progress(50)
            .map_err(|e| classify(&e.to_string(), &ClassificationContext::default()))?;
        Ok(state)
    }
}
