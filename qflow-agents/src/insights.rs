use async_trait::async_trait;
use qflow_core::{ClassifiedError, Insight, Recommendation, Role, Stage, WorkflowState};
use qflow_executor::ExecutorBackend;
use qflow_llm::{CompletionRequest, Message};
use qflow_recovery::{classify, ClassificationContext};

use crate::agent::Agent;
use crate::deps::AgentDeps;

fn role_tone(role: Role) -> &'static str {
    match role {
        Role::Admin | Role::Manager => "Favor concrete, action-oriented recommendations a decision-maker can act on.",
        Role::Analyst => "Include the methodology and caveats behind each observation.",
        Role::Employee | Role::Viewer => "Keep it a plain-language summary, no jargon.",
    }
}

pub struct InsightsAgent;

#[async_trait]
impl<B: ExecutorBackend> Agent<B> for InsightsAgent {
    async fn run(&self, mut state: WorkflowState, deps: &AgentDeps<B>) -> Result<WorkflowState, ClassifiedError> {
        let context = ClassificationContext { stage: Some("insights_generated".into()) };
        let result = state.query_result.clone().ok_or_else(|| classify("no rows to derive insights from", &context))?;

        let tone = role_tone(state.user_ref.role);
        let prompt = format!(
            "Given {} rows over columns {:?}, produce JSON {{\"insights\": [{{\"title\",\"description\"}}], \
             \"recommendations\": [{{\"title\",\"description\"}}]}}. {}",
            result.row_count, result.schema, tone
        );
        let request = CompletionRequest::new(vec![Message { role: "user".to_string(), content: prompt }]);
        let completion = deps.llm.complete(request).await.map_err(|e| {
            classify(&format!("llm error: {e}"), &context)
        })?;

        let raw = completion.content.unwrap_or_default();
        let parsed: Option<serde_json::Value> = serde_json::from_str(&raw).ok();

        let (insights, recommendations) = match parsed {
            Some(value) => (parse_items(&value, "insights"), parse_items(&value, "recommendations")),
            None => (
                vec![Insight {
                    title: "Result summary".to_string(),
                    description: format!("Query returned {} rows.", result.row_count),
                    confidence: Some(0.5),
                }],
                Vec::new(),
            ),
        };

        state.insights = insights;
        state.recommendations = recommendations;
        state
            .check_chart_insight_invariant()
            .map_err(|e| classify(&e.to_string(), &context))?;
        state
            .transition_to(Stage::InsightsGenerated)
            .map_err(|e| classify(&e.to_string(), &ClassificationContext::default()))?;
        state
            .set_progress(95)
            .map_err(|e| classify(&e.to_string(), &ClassificationContext::default()))?;
        Ok(state)
    }
}

fn parse_items(value: &serde_json::Value, key: &str) -> Vec<Insight> {
    value
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some(Insight {
                        title: item.get("title")?.as_str()?.to_string(),
                        description: item.get("description")?.as_str()?.to_string(),
                        confidence: item.get("confidence").and_then(|c| c.as_f64()),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use qflow_core::{AnalysisMode, ConversationId, DataSourceId, Plan, QueryResult, RequestId, Tenant, TenantId, UserId};
    use qflow_executor::StubBackend;
    use qflow_llm::{CompletionResult, ScriptedLlm, UsageMetadata};
    use std::sync::Arc;

    fn state_with_role(role: Role) -> WorkflowState {
        let mut state = WorkflowState::new(
            RequestId::generate(),
            ConversationId::generate(),
            qflow_core::UserRef { id: UserId::new("u1"), role },
            Tenant {
                id: TenantId::new("t1"),
                plan: Plan::Pro,
                ai_credits_used: 0,
                ai_credits_limit: Some(1000),
                max_projects: 10,
                max_data_sources: 5,
                trial_ends_at: None,
            },
            "insights please".into(),
            Some(DataSourceId::new("ds1")),
            AnalysisMode::Standard,
        );
        state.query_result = Some(QueryResult {
            rows: vec![[("n".to_string(), qflow_core::CellValue::Number(1.0))].into_iter().collect()],
            row_count: 1,
            schema: vec!["n".into()],
            truncated: false,
        });
        for stage in [
            Stage::RoutedToNl2Sql,
            Stage::SqlGenerated,
            Stage::SqlValidated,
            Stage::QueryExecuting,
            Stage::QueryExecuted,
            Stage::ResultsValidated,
            Stage::ChartGenerated,
        ] {
            state.transition_to(stage).unwrap();
        }
        state
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
    async fn parses_structured_insights_and_recommendations() {
        let llm = Arc::new(ScriptedLlm::new(vec![CompletionResult::text(
            "stub",
            r#"{"insights": [{"title": "Growth", "description": "Up 10%"}], "recommendations": []}"#,
            UsageMetadata::default(),
        )]));
        let outcome = InsightsAgent.run(state_with_role(Role::Analyst), &deps(llm)).await.unwrap();
        assert_eq!(outcome.insights.len(), 1);
        assert_eq!(outcome.progress.percentage, 95);
    }

    #[tokio::test]
    async fn unparseable_response_falls_back_to_a_plain_summary() {
        let llm = Arc::new(ScriptedLlm::new(vec![CompletionResult::text(
            "stub",
            "not json",
            UsageMetadata::default(),
        )]));
        let outcome = InsightsAgent.run(state_with_role(Role::Viewer), &deps(llm)).await.unwrap();
        assert_eq!(outcome.insights.len(), 1);
        assert!(outcome.insights[0].description.contains("1 rows"));
    }
}
