use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error_taxonomy::ClassifiedError;
use crate::ids::{ConversationId, DataSourceId, RequestId};
use crate::tenancy::{Tenant, UserRef};

/// A discrete state in the workflow state machine (spec §3).
///
/// Ordering matters: `Stage`'s `Ord` impl is the monotonicity check used by
/// [`WorkflowState::transition_to`] — later variants are considered "further along"
/// than earlier ones, mirroring the linear happy path. Recovery edges are the only
/// sanctioned way to move backwards and must go through
/// [`WorkflowState::recover_to`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Received,
    RoutedToNl2Sql,
    RoutedToChart,
    RoutedToInsights,
    SqlGenerated,
    SqlValidated,
    QueryExecuting,
    QueryExecuted,
    ResultsValidated,
    ChartGenerated,
    InsightsGenerated,
    Complete,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    Standard,
    Deep,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub primary_agent: String,
    pub strategy: String,
    pub confidence: f64,
    pub reasoning: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(f64),
    Timestamp(DateTime<Utc>),
    Text(String),
}

pub type Row = HashMap<String, CellValue>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub rows: Vec<Row>,
    pub row_count: usize,
    pub schema: Vec<String>,
    pub truncated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig(pub serde_json::Value);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub title: String,
    pub description: String,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Progress {
    pub percentage: u8,
    pub stage: Stage,
}

impl Progress {
    pub fn new() -> Self {
        Self { percentage: 0, stage: Stage::Received }
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionMetadata {
    pub started_at: Option<DateTime<Utc>>,
    pub per_stage_ms: HashMap<String, u64>,
    /// Retry count per stage name, used by the recovery planner (C6) to enforce
    /// `retryBudgetPerStage`.
    pub retries: HashMap<String, u32>,
    /// Accumulated LLM token usage across every C1 call made during this run, used
    /// by C9 to debit the actual credit cost on completion rather than the
    /// pre-admission estimate (spec §9 Open Question decision).
    pub total_tokens_in: u64,
    pub total_tokens_out: u64,
}

/// Opaque, externally-owned conversation history; the core only ever reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMemory(pub serde_json::Value);

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("invalid stage transition from {from:?} to {to:?}")]
    InvalidTransition { from: Stage, to: Stage },
    #[error("state integrity violation: {0}")]
    StateIntegrity(String),
    #[error("validation failed: {0}")]
    Validation(String),
}

/// The central entity of the orchestration core (spec §3). One instance per
/// workflow run; created on request admission, discarded after its terminal event
/// is emitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub request_id: RequestId,
    pub conversation_id: ConversationId,
    pub user_ref: UserRef,
    pub tenant: Tenant,
    pub query: String,
    pub data_source_id: Option<DataSourceId>,
    pub analysis_mode: AnalysisMode,
    pub stage: Stage,
    pub routing_decision: Option<RoutingDecision>,
    pub sql_query: Option<String>,
    pub query_result: Option<QueryResult>,
    pub echarts_config: Option<ChartConfig>,
    pub insights: Vec<Insight>,
    pub recommendations: Vec<Recommendation>,
    pub narration: Option<String>,
    pub progress: Progress,
    pub error: Option<ClassifiedError>,
    pub critical_failure: bool,
    pub execution_metadata: ExecutionMetadata,
    pub memory: Option<ConversationMemory>,
}

impl WorkflowState {
    pub fn new(
        request_id: RequestId,
        conversation_id: ConversationId,
        user_ref: UserRef,
        tenant: Tenant,
        query: String,
        data_source_id: Option<DataSourceId>,
        analysis_mode: AnalysisMode,
    ) -> Self {
        Self {
            request_id,
            conversation_id,
            user_ref,
            tenant,
            query,
            data_source_id,
            analysis_mode,
            stage: Stage::Received,
            routing_decision: None,
            sql_query: None,
            query_result: None,
            echarts_config: None,
            insights: Vec::new(),
            recommendations: Vec::new(),
            narration: None,
            progress: Progress::new(),
            error: None,
            critical_failure: false,
            execution_metadata: ExecutionMetadata {
                started_at: Some(Utc::now()),
                ..Default::default()
            },
            memory: None,
        }
    }

    /// Advances `stage` along the happy path. Fails if `to <= self.stage` — use
    /// [`Self::recover_to`] for the sanctioned backward edges from C6.
    pub fn transition_to(&mut self, to: Stage) -> Result<(), CoreError> {
        if self.critical_failure {
            return Err(CoreError::StateIntegrity(
                "cannot transition after critical_failure".into(),
            ));
        }
        if to <= self.stage && !(self.stage == Stage::Received && to == Stage::Received) {
            return Err(CoreError::InvalidTransition { from: self.stage, to });
        }
        self.stage = to;
        Ok(())
    }

    /// The only sanctioned way to move `stage` backwards: a recovery edge selected
    /// by C6 (e.g. `sql_validated -> sql_generated` to re-prompt NL2SQL).
    pub fn recover_to(&mut self, to: Stage) -> Result<(), CoreError> {
        if self.critical_failure {
            return Err(CoreError::StateIntegrity(
                "cannot recover after critical_failure".into(),
            ));
        }
        self.stage = to;
        Ok(())
    }

    /// Enforces the `progress.percentage` non-decreasing invariant (spec §3, §8).
    pub fn set_progress(&mut self, percentage: u8) -> Result<(), CoreError> {
        if percentage < self.progress.percentage {
            return Err(CoreError::StateIntegrity(format!(
                "progress cannot decrease: {} -> {}",
                self.progress.percentage, percentage
            )));
        }
        self.progress = Progress { percentage, stage: self.stage };
        Ok(())
    }

    pub fn mark_critical_failure(&mut self, error: ClassifiedError) -> Result<(), CoreError> {
        self.error = Some(error);
        self.critical_failure = true;
        self.stage = Stage::Failed;
        Ok(())
    }

    /// Checks the cross-field invariant from spec §3: chart/insights may be
    /// non-empty only if there were rows, or the run never had a data source
    /// (the conversational branch).
    pub fn check_chart_insight_invariant(&self) -> Result<(), CoreError> {
        let has_chart_or_insights = self.echarts_config.is_some() || !self.insights.is_empty();
        if !has_chart_or_insights {
            return Ok(());
        }
        let has_rows = self.query_result.as_ref().is_some_and(|r| r.row_count > 0);
        let conversational = self.data_source_id.is_none();
        if has_rows || conversational {
            Ok(())
        } else {
            Err(CoreError::StateIntegrity(
                "chart/insights present without rows and outside the conversational branch".into(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{ConversationId, RequestId, TenantId, UserId};
    use crate::tenancy::{Plan, Role};

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
            "how many customers by year".into(),
            Some(DataSourceId::new("ds_1")),
            AnalysisMode::Standard,
        )
    }

    #[test]
    fn stage_advances_monotonically() {
        let mut s = state();
        s.transition_to(Stage::RoutedToNl2Sql).unwrap();
        s.transition_to(Stage::SqlGenerated).unwrap();
        assert!(s.transition_to(Stage::Received).is_err());
    }

    #[test]
    fn progress_cannot_decrease() {
        let mut s = state();
        s.set_progress(30).unwrap();
        assert!(s.set_progress(10).is_err());
        s.set_progress(30).unwrap();
    }

    #[test]
    fn critical_failure_forbids_further_transitions() {
        let mut s = state();
        s.mark_critical_failure(ClassifiedError {
            category: crate::error_taxonomy::ErrorCategory::Unknown,
            subtype: None,
            severity: crate::error_taxonomy::ErrorSeverity::Critical,
            recoverability: crate::error_taxonomy::Recoverability::None,
            suggested_fix: None,
            retry_strategy: None,
            confidence: 0.9,
        })
        .unwrap();
        assert!(s.transition_to(Stage::SqlGenerated).is_err());
        assert_eq!(s.stage, Stage::Failed);
    }

    #[test]
    fn chart_without_rows_outside_conversational_branch_violates_invariant() {
        let mut s = state();
        s.echarts_config = Some(ChartConfig(serde_json::json!({})));
        assert!(s.check_chart_insight_invariant().is_err());
    }

    #[test]
    fn chart_without_rows_in_conversational_branch_is_allowed() {
        let mut s = state();
        s.data_source_id = None;
        s.echarts_config = Some(ChartConfig(serde_json::json!({})));
        assert!(s.check_chart_insight_invariant().is_ok());
    }
}
