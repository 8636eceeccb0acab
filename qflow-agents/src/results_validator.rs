use async_trait::async_trait;
use qflow_core::{ClassifiedError, Stage, WorkflowState};
use qflow_executor::ExecutorBackend;
use qflow_recovery::{classify, ClassificationContext};

use crate::agent::Agent;
use crate::deps::AgentDeps;

/// Checks shape consistency of the executed rows before handing them to
/// chart/insights agents (spec §4.7.e). An empty result set is valid and is
/// simply recorded, not rejected.
pub struct ResultsValidatorAgent;

#[async_trait]
impl<B: ExecutorBackend> Agent<B> for ResultsValidatorAgent {
    async fn run(&self, mut state: WorkflowState, _deps: &AgentDeps<B>) -> Result<WorkflowState, ClassifiedError> {
        let context = ClassificationContext { stage: Some("results_validated".into()) };
        let result = state.query_result.as_ref().ok_or_else(|| classify("no query_result to validate", &context))?;

        if let Some(first_row) = result.rows.first() {
            let expected_keys: std::collections::BTreeSet<&String> = first_row.keys().collect();
            for row in result.rows.iter().take(10).skip(1) {
                let keys: std::collections::BTreeSet<&String> = row.keys().collect();
                if keys != expected_keys {
                    return Err(classify("query result rows have inconsistent columns", &context));
                }
            }
        }

        state
            .transition_to(Stage::ResultsValidated)
            .map_err(|e| classify(&e.to_string(), &ClassificationContext::default()))?;
        state
            .set_progress(60)
            .map_err(|e| classify(&e.to_string(), &ClassificationContext::default()))?;
        Ok(state)
    }
}
