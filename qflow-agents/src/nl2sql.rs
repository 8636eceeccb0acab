use async_trait::async_trait;
use qflow_core::{ClassifiedError, Stage, WorkflowState};
use qflow_executor::ExecutorBackend;
use qflow_llm::{CompletionRequest, Message};
use qflow_recovery::{classify, ClassificationContext};
use qflow_schema::{optimize, Schema};
use regex::Regex;
use std::sync::LazyLock;

use crate::agent::Agent;
use crate::deps::AgentDeps;

static SELECT_BLOCK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?is)select\b.*").unwrap());

/// Pulls the first `SELECT ...` statement out of a model response, discarding
/// any leading prose and trailing commentary/code fences.
fn extract_select(raw: &str) -> Option<String> {
    let stripped = raw.trim().trim_start_matches("```sql").trim_start_matches("```").trim_end_matches("```");
    let found = SELECT_BLOCK.find(stripped)?.as_str().trim();
    let without_fence = found.split("```").next().unwrap_or(found).trim();
    Some(without_fence.trim_end_matches(';').to_string())
}

pub struct Nl2SqlAgent;

#[async_trait]
impl<B: ExecutorBackend> Agent<B> for Nl2SqlAgent {
    async fn run(&self, mut state: WorkflowState, deps: &AgentDeps<B>) -> Result<WorkflowState, ClassifiedError> {
        let data_source_id = state.data_source_id.clone().ok_or_else(|| {
            classify("nl2sql invoked without a data source", &ClassificationContext { stage: Some("nl2sql".into()) })
        })?;

        let schema = deps.schema_registry.fetch_schema(data_source_id.as_ref()).await.unwrap_or_else(|_| Schema::default());
        let pruned = optimize(&schema, &state.query, None, deps.config.max_schema_tokens);
        let schema_text = pruned.format(qflow_schema::FormatStyle::Compact);

        let system_prompt = format!(
            "You translate natural language into a single read-only SELECT query. \
             Only SELECT statements are allowed; never emit DROP/DELETE/TRUNCATE/ALTER/CREATE/INSERT/UPDATE. \
             Available tables: {schema_text}"
        );
        let request = CompletionRequest::new(vec![Message { role: "user".to_string(), content: state.query.clone() }])
            .with_system_prompt(system_prompt);

        let completion = deps.llm.complete(request).await.map_err(|e| {
            classify(&format!("llm error: {e}"), &ClassificationContext { stage: Some("nl2sql".into()) })
        })?;

        let raw = completion.content.unwrap_or_default();
        let sql = extract_select(&raw).ok_or_else(|| {
            classify("model did not return a SELECT statement", &ClassificationContext { stage: Some("nl2sql".into()) })
        })?;

        state.sql_query = Some(sql);
        state
            .transition_to(Stage::SqlGenerated)
            .map_err(|e| classify(&e.to_string(), &ClassificationContext::default()))?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qflow_core::{AnalysisMode, ConversationId, Plan, RequestId, Role, Tenant, TenantId, UserId, UserRef};
    use qflow_executor::StubBackend;
    use qflow_llm::{CompletionResult, ScriptedLlm, UsageMetadata};
    use std::sync::Arc;

    fn state() -> WorkflowState {
        WorkflowState::new(
            RequestId::generate(),
            ConversationId::generate(),
            UserRef { id: UserId::new("u1"), role: Role::Analyst },
            Tenant {
                id: TenantId::new("t1"),
                plan: Plan::Pro,
                ai_credits_used: 0,
                ai_credits_limit: Some(1000),
                max_projects: 10,
                max_data_sources: 5,
                trial_ends_at: None,
            },
            "how many customers".into(),
            Some(qflow_core::DataSourceId::new("ds1")),
            AnalysisMode::Standard,
        )
    }

    fn deps(llm: Arc<dyn qflow_llm::Llm>) -> AgentDeps<StubBackend> {
        AgentDeps {
            llm,
            schema_registry: Arc::new(crate::test_support::EmptyRegistry),
            executor_backend: Arc::new(StubBackend::empty()),
            config: Arc::new(qflow_core::Config::default()),
        }
    }

    #[tokio::test]
    async fn extracts_select_and_discards_prose() {
        let llm = Arc::new(ScriptedLlm::new(vec![CompletionResult::text(
            "stub",
            "Sure! ```sql\nSELECT COUNT(*) FROM customers;\n```",
            UsageMetadata::default(),
        )]));
        let result = Nl2SqlAgent.run(state(), &deps(llm)).await.unwrap();
        assert_eq!(result.sql_query.as_deref(), Some("SELECT COUNT(*) FROM customers"));
        assert_eq!(result.stage, Stage::SqlGenerated);
    }

    #[tokio::test]
    async fn non_select_response_is_classified_as_an_error() {
        let llm = Arc::new(ScriptedLlm::new(vec![CompletionResult::text(
            "stub",
            "I cannot help with that.",
            UsageMetadata::default(),
        )]));
        let err = Nl2SqlAgent.run(state(), &deps(llm)).await.unwrap_err();
        assert_eq!(err.category, qflow_core::ErrorCategory::SqlGeneration);
    }
}
