use async_trait::async_trait;
use qflow_core::{CellValue, ChartConfig, ClassifiedError, QueryResult, Row, Stage, WorkflowState};
use qflow_executor::ExecutorBackend;
use qflow_recovery::{classify, ClassificationContext};
use serde_json::json;

use crate::agent::Agent;
use crate::deps::AgentDeps;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Categorical,
    Numeric,
    Timestamp,
}

fn column_kind(rows: &[Row], column: &str) -> ColumnKind {
    for row in rows {
        match row.get(column) {
            Some(CellValue::Number(_)) => return ColumnKind::Numeric,
            Some(CellValue::Timestamp(_)) => return ColumnKind::Timestamp,
            Some(CellValue::Text(_)) | Some(CellValue::Bool(_)) => return ColumnKind::Categorical,
            _ => continue,
        }
    }
    ColumnKind::Categorical
}

/// Deterministic fallback rules from spec §4.7.f, used when no LLM
/// function-calling result is available or the function call fails schema
/// validation.
fn rule_based_chart(result: &QueryResult) -> ChartConfig {
    let columns = &result.schema;
    let kinds: Vec<(String, ColumnKind)> =
        columns.iter().map(|c| (c.clone(), column_kind(&result.rows, c))).collect();

    let numeric: Vec<&String> = kinds.iter().filter(|(_, k)| *k == ColumnKind::Numeric).map(|(c, _)| c).collect();
    let categorical: Vec<&String> =
        kinds.iter().filter(|(_, k)| *k == ColumnKind::Categorical).map(|(c, _)| c).collect();
    let timestamp: Vec<&String> = kinds.iter().filter(|(_, k)| *k == ColumnKind::Timestamp).map(|(c, _)| c).collect();

    let chart_type = if !timestamp.is_empty() && !numeric.is_empty() {
        "line"
    } else if numeric.len() >= 2 {
        "scatter"
    } else if categorical.len() == 1 && numeric.len() == 1 {
        "bar"
    } else if categorical.len() == 1 && numeric.is_empty() {
        "pie"
    } else {
        "bar"
    };

    ChartConfig(json!({
        "type": chart_type,
        "xAxis": categorical.first().or(timestamp.first()).cloned(),
        "yAxis": numeric.first().cloned(),
    }))
}

pub struct ChartGenerationAgent;

#[async_trait]
impl<B: ExecutorBackend> Agent<B> for ChartGenerationAgent {
    async fn run(&self, mut state: WorkflowState, _deps: &AgentDeps<B>) -> Result<WorkflowState, ClassifiedError> {
        let context = ClassificationContext { stage: Some("chart_generated".into()) };
        let result = state.query_result.clone().ok_or_else(|| classify("no rows to chart", &context))?;

        // TODO: function-calling chart generation (schema-validated LLM output,
        // falling back to rule_based_chart on validation failure) is not wired
        // yet — this only ever takes the deterministic path.
        state.echarts_config = Some(rule_based_chart(&result));
        state
            .check_chart_insight_invariant()
            .map_err(|e| classify(&e.to_string(), &context))?;
        state
            .transition_to(Stage::ChartGenerated)
            .map_err(|e| classify(&e.to_string(), &ClassificationContext::default()))?;
        state
            .set_progress(80)
            .map_err(|e| classify(&e.to_string(), &ClassificationContext::default()))?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qflow_core::{AnalysisMode, ConversationId, DataSourceId, Plan, RequestId, Role, Tenant, TenantId, UserId, UserRef};
    use qflow_executor::StubBackend;
    use std::sync::Arc;

    fn deps() -> AgentDeps<StubBackend> {
        AgentDeps {
            llm: Arc::new(qflow_llm::StubLlm::new(qflow_llm::CompletionResult::empty_response("stub"))),
            schema_registry: Arc::new(crate::test_support::EmptyRegistry),
            executor_backend: Arc::new(StubBackend::empty()),
            config: Arc::new(qflow_core::Config::default()),
        }
    }

    fn state_with_result(result: QueryResult) -> WorkflowState {
        let mut state = WorkflowState::new(
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
            "chart this".into(),
            Some(DataSourceId::new("ds1")),
            AnalysisMode::Standard,
        );
        state.query_result = Some(result);
        for stage in [
            Stage::RoutedToNl2Sql,
            Stage::SqlGenerated,
            Stage::SqlValidated,
            Stage::QueryExecuting,
            Stage::QueryExecuted,
            Stage::ResultsValidated,
        ] {
            state.transition_to(stage).unwrap();
        }
        state
    }

    fn row(category: &str, n: f64) -> Row {
        [("category".to_string(), CellValue::Text(category.to_string())), ("n".to_string(), CellValue::Number(n))]
            .into_iter()
            .collect()
    }

    #[tokio::test]
    async fn single_categorical_and_numeric_becomes_bar() {
        let result = QueryResult {
            rows: vec![row("a", 1.0), row("b", 2.0)],
            row_count: 2,
            schema: vec!["category".into(), "n".into()],
            truncated: false,
        };
        let outcome = ChartGenerationAgent.run(state_with_result(result), &deps()).await.unwrap();
        let config = outcome.echarts_config.unwrap().0;
        assert_eq!(config["type"], "bar");
        assert_eq!(outcome.progress.percentage, 80);
    }

    #[tokio::test]
    async fn chart_without_rows_violates_invariant_and_is_rejected() {
        let result = QueryResult { rows: vec![], row_count: 0, schema: vec![], truncated: false };
        let err = ChartGenerationAgent.run(state_with_result(result), &deps()).await.unwrap_err();
        assert_eq!(err.category, qflow_core::ErrorCategory::Unknown);
    }
}
