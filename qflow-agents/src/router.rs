use async_trait::async_trait;
use qflow_core::{ClassifiedError, RoutingDecision, Stage, WorkflowState};
use qflow_executor::ExecutorBackend;
use qflow_llm::{CompletionRequest, Message};
use qflow_recovery::{classify, ClassificationContext};
use regex::Regex;
use std::sync::LazyLock;

use crate::agent::Agent;
use crate::deps::AgentDeps;

static JSON_OBJECT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

fn fallback_decision() -> RoutingDecision {
    RoutingDecision {
        primary_agent: "nl2sql".to_string(),
        strategy: "sequential".to_string(),
        confidence: 0.5,
        reasoning: None,
    }
}

fn extract_decision(raw: &str) -> RoutingDecision {
    let stripped = raw.trim().trim_start_matches("```json").trim_start_matches("```").trim_end_matches("```");
    let Some(candidate) = JSON_OBJECT.find(stripped) else {
        return fallback_decision();
    };
    match serde_json::from_str::<serde_json::Value>(candidate.as_str()) {
        Ok(value) => RoutingDecision {
            primary_agent: value.get("primaryAgent").and_then(|v| v.as_str()).unwrap_or("nl2sql").to_string(),
            strategy: value.get("strategy").and_then(|v| v.as_str()).unwrap_or("sequential").to_string(),
            confidence: value.get("confidence").and_then(|v| v.as_f64()).unwrap_or(0.5),
            reasoning: value.get("reasoning").and_then(|v| v.as_str()).map(str::to_string),
        },
        Err(_) => fallback_decision(),
    }
}

/// Supervises the request: either closes a conversational turn with no data
/// source attached, or asks the model to pick the next agent.
pub struct RouterAgent;

#[async_trait]
impl<B: ExecutorBackend> Agent<B> for RouterAgent {
    async fn run(&self, mut state: WorkflowState, deps: &AgentDeps<B>) -> Result<WorkflowState, ClassifiedError> {
        if state.data_source_id.is_none() {
            let request = CompletionRequest::new(vec![Message {
                role: "user".to_string(),
                content: format!(
                    "The user asked: \"{}\". No data source is connected yet. Politely explain that \
                     data analysis requires connecting a data source first.",
                    state.query
                ),
            }]);
            let completion = deps.llm.complete(request).await.map_err(|e| {
                classify(&format!("llm error: {e}"), &ClassificationContext { stage: Some("routed".into()) })
            })?;
            state.narration = Some(completion.content.unwrap_or_default());
            state
                .transition_to(Stage::Complete)
                .map_err(|e| classify(&e.to_string(), &ClassificationContext::default()))?;
            state
                .set_progress(100)
                .map_err(|e| classify(&e.to_string(), &ClassificationContext::default()))?;
            return Ok(state);
        }

        let prompt = format!(
            "Route this analytics request to the right agent. Respond with JSON: \
             {{\"primaryAgent\": \"nl2sql\"|\"chart\"|\"insights\", \"strategy\": \"sequential\", \
             \"confidence\": 0.0-1.0, \"reasoning\": \"...\"}}. Query: \"{}\"",
            state.query
        );
        let request = CompletionRequest::new(vec![Message { role: "user".to_string(), content: prompt }]);
        let decision = match deps.llm.complete(request).await {
            Ok(completion) => extract_decision(&completion.content.unwrap_or_default()),
            Err(_) => fallback_decision(),
        };

        let next_stage = match decision.primary_agent.as_str() {
            "chart" => Stage::RoutedToChart,
            "insights" => Stage::RoutedToInsights,
            _ => Stage::RoutedToNl2Sql,
        };
        state.routing_decision = Some(decision);
        state
            .transition_to(next_stage)
            .map_err(|e| classify(&e.to_string(), &ClassificationContext::default()))?;
        Ok(state)
    }
}
