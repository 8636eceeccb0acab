use async_trait::async_trait;
use qflow_core::{ClassifiedError, Stage, WorkflowState};
use qflow_executor::ExecutorBackend;
use qflow_recovery::{classify, ClassificationContext};

use crate::agent::Agent;
use crate::deps::AgentDeps;

/// Assembles the final narration from whatever the run produced and closes
/// out the workflow (spec §4.7.h).
pub struct NarratorAgent;

#[async_trait]
impl<B: ExecutorBackend> Agent<B> for NarratorAgent {
    async fn run(&self, mut state: WorkflowState, _deps: &AgentDeps<B>) -> Result<WorkflowState, ClassifiedError> {
        let mut narration = String::new();
        if let Some(result) = &state.query_result {
            narration.push_str(&format!("Found {} row(s). ", result.row_count));
        }
        if state.echarts_config.is_some() {
            narration.push_str("A chart visualizes the result. ");
        }
        for insight in &state.insights {
            narration.push_str(&format!("{}: {}. ", insight.title, insight.description));
        }
        for recommendation in &state.recommendations {
            narration.push_str(&format!("Recommended: {}. ", recommendation.title));
        }
        if narration.is_empty() {
            narration.push_str("Analysis complete.");
        }

        state.narration = Some(narration.trim().to_string());
        state
            .transition_to(Stage::Complete)
            .map_err(|e| classify(&e.to_string(), &ClassificationContext::default()))?;
        state
            .set_progress(100)
            .map_err(|e| classify(&e.to_string(), &ClassificationContext::default()))?;
        Ok(state)
    }
}
