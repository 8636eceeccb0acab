use async_trait::async_trait;
use qflow_core::{ClassifiedError, WorkflowState};
use qflow_executor::ExecutorBackend;

use crate::deps::AgentDeps;

/// A pure transformation over `WorkflowState`. Each implementation only ever
/// writes the fields its stage is allow-listed to touch (spec §4.7/§4.8); any
/// write outside that allow-list is the orchestrator's job to catch as a
/// `state_integrity` violation, not this trait's.
#[async_trait]
pub trait Agent<B: ExecutorBackend>: Send + Sync {
    async fn run(&self, state: WorkflowState, deps: &AgentDeps<B>) -> Result<WorkflowState, ClassifiedError>;
}
