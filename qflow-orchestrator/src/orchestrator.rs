use std::sync::Arc;
use std::time::{Duration, Instant};

use qflow_agents::{
    Agent, ChartGenerationAgent, InsightsAgent, NarratorAgent, Nl2SqlAgent, QueryExecutorAgent,
    ResultsValidatorAgent, RouterAgent, SqlValidatorAgent,
};
use qflow_core::{ClassifiedError, DataSource, ErrorCategory, Stage, WorkflowState};
use qflow_executor::ExecutorBackend;
use qflow_metrics::MetricsRecorder;
use qflow_recovery::{classify, retry_budget_exhausted, strategy_for, ClassificationContext};
use qflow_stream::{Frame, StreamingSession};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Decides which stage to fall back to on a recoverable error, mirroring the
/// original's named recovery edges (spec §4.6, §4.8): a rejected SQL statement
/// goes back through NL2SQL for a re-prompt, and so does an executor failure
/// classified as a syntax or type problem rather than a data-access one.
fn recovery_target(failing_stage: Stage, category: ErrorCategory, subtype: Option<&str>) -> Option<Stage> {
    match (failing_stage, category) {
        (Stage::SqlGenerated, ErrorCategory::SqlValidation) => Some(Stage::RoutedToNl2Sql),
        (Stage::SqlValidated, ErrorCategory::SqlExecution)
            if matches!(subtype, Some("syntax_error") | Some("type_mismatch")) =>
        {
            Some(Stage::RoutedToNl2Sql)
        }
        _ => None,
    }
}

/// Drives a [`WorkflowState`] from `Received` to `Complete`/`Failed`, dispatching
/// each stage to its [`Agent`] implementation, applying C6's recovery edges on
/// failure, and emitting [`Frame`]s to a [`StreamingSession`] as it goes.
pub struct Orchestrator<B: ExecutorBackend> {
    deps: qflow_agents::AgentDeps<B>,
    recorder: Arc<MetricsRecorder>,
    stage_timeout: Duration,
    retry_budget_per_stage: u32,
}

impl<B: ExecutorBackend + 'static> Orchestrator<B> {
    pub fn new(deps: qflow_agents::AgentDeps<B>, recorder: Arc<MetricsRecorder>) -> Self {
        let stage_timeout = Duration::from_secs(deps.config.default_timeout_sec);
        let retry_budget_per_stage = deps.config.retry_budget_per_stage;
        Self { deps, recorder, stage_timeout, retry_budget_per_stage }
    }

    async fn dispatch(
        &self,
        stage: Stage,
        state: WorkflowState,
        data_source: Option<&DataSource>,
        cancel: CancellationToken,
    ) -> Result<WorkflowState, ClassifiedError> {
        match stage {
            Stage::Received => RouterAgent.run(state, &self.deps).await,
            Stage::RoutedToNl2Sql => Nl2SqlAgent.run(state, &self.deps).await,
            Stage::SqlGenerated => SqlValidatorAgent.run(state, &self.deps).await,
            Stage::SqlValidated => {
                let data_source = data_source.cloned().ok_or_else(|| {
                    classify("no data source resolved for query execution", &ClassificationContext::default())
                })?;
                QueryExecutorAgent { data_source, cancel }.run(state, &self.deps).await
            }
            Stage::QueryExecuted => ResultsValidatorAgent.run(state, &self.deps).await,
            Stage::ResultsValidated | Stage::RoutedToChart => ChartGenerationAgent.run(state, &self.deps).await,
            Stage::ChartGenerated | Stage::RoutedToInsights => InsightsAgent.run(state, &self.deps).await,
            Stage::InsightsGenerated => NarratorAgent.run(state, &self.deps).await,
            Stage::QueryExecuting | Stage::Complete | Stage::Failed => Ok(state),
        }
    }

    /// Runs `state` to a terminal stage, streaming progress and result frames
    /// through `session`. Returns the final state (`stage` is always `Complete`
    /// or `Failed`).
    pub async fn run(
        &self,
        mut state: WorkflowState,
        data_source: Option<DataSource>,
        session: &StreamingSession,
        cancel: CancellationToken,
    ) -> WorkflowState {
        let _ = session
            .send(Frame::Start {
                request_id: state.request_id.to_string(),
                conversation_id: state.conversation_id.to_string(),
            })
            .await;

        loop {
            if state.stage == Stage::Complete || state.stage == Stage::Failed {
                break;
            }

            let stage = state.stage;
            let _ = session
                .send(Frame::Progress {
                    percentage: state.progress.percentage,
                    message: format!("running {stage:?}"),
                    stage,
                })
                .await;

            let stage_key = format!("{stage:?}");
            let input = state.clone();
            let span = tracing::info_span!("orchestrator.stage", stage = %stage_key);
            let started = Instant::now();

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    Err(classify("run cancelled", &ClassificationContext { stage: Some(stage_key.clone()) }))
                }
                res = tokio::time::timeout(
                    self.stage_timeout,
                    self.dispatch(stage, input, data_source.as_ref(), cancel.clone()).instrument(span),
                ) => {
                    match res {
                        Ok(result) => result,
                        Err(_) => Err(classify(
                            "stage timed out",
                            &ClassificationContext { stage: Some("timeout".into()) },
                        )),
                    }
                }
            };

            match outcome {
                Ok(next_state) => {
                    self.recorder.record_success(&stage_key, started.elapsed(), None, None);
                    state = next_state;
                }
                Err(err) => {
                    self.recorder.record_failure(&stage_key, err.category, &format!("{err:?}"), started.elapsed());

                    let retries_so_far = *state.execution_metadata.retries.get(&stage_key).unwrap_or(&0);
                    let strategy = strategy_for(err.category, err.subtype.as_deref());
                    let budget = strategy.max_retries.min(self.retry_budget_per_stage);

                    let recoverable =
                        matches!(err.recoverability, qflow_core::Recoverability::Automatic | qflow_core::Recoverability::Retry);
                    let target = recovery_target(stage, err.category, err.subtype.as_deref());

                    if recoverable && !retry_budget_exhausted(retries_so_far, strategy) && budget > retries_so_far {
                        if let Some(target) = target {
                            state.execution_metadata.retries.insert(stage_key.clone(), retries_so_far + 1);
                            if state.recover_to(target).is_ok() {
                                continue;
                            }
                        }
                    }

                    let _ = state.mark_critical_failure(err);
                    break;
                }
            }
        }

        self.emit_terminal_frames(&state, session).await;
        state
    }

    async fn emit_terminal_frames(&self, state: &WorkflowState, session: &StreamingSession) {
        if state.stage == Stage::Failed {
            let message = state.error.as_ref().map(|e| format!("{e:?}")).unwrap_or_default();
            let _ = session.send(Frame::Error { message, classified: state.error.clone() }).await;
            return;
        }
        if let Some(config) = state.echarts_config.clone() {
            let _ = session.send(Frame::Chart { config }).await;
        }
        if !state.insights.is_empty() {
            let _ = session.send(Frame::Insights { items: state.insights.clone() }).await;
        }
        if !state.recommendations.is_empty() {
            let _ = session.send(Frame::Recommendations { items: state.recommendations.clone() }).await;
        }
        if let Some(narration) = state.narration.clone() {
            let _ = session.send(Frame::Partial { narration }).await;
        }
        let _ = session.send(Frame::Complete { cached: false }).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qflow_core::{
        AnalysisMode, CellValue, ConnectionDescriptor, ConversationId, DataSourceId, DataSourceKind, Dialect,
        Plan, RequestId, Role, Tenant, TenantId, UserId, UserRef,
    };
    use qflow_executor::StubBackend;
    use qflow_llm::{CompletionResult, ScriptedLlm, UsageMetadata};
    use std::sync::Arc;

    struct EmptyRegistry;

    #[async_trait::async_trait]
    impl qflow_schema::DataSourceRegistry for EmptyRegistry {
        async fn fetch_schema(&self, _data_source_id: &str) -> Result<qflow_schema::Schema, qflow_schema::SchemaError> {
            Ok(qflow_schema::Schema::default())
        }
    }

    fn data_source() -> DataSource {
        DataSource {
            id: DataSourceId::new("ds1"),
            kind: DataSourceKind::Postgres,
            dialect: Dialect::Postgres,
            connection: ConnectionDescriptor(serde_json::json!({})),
            schema_fingerprint: "fp".into(),
        }
    }

    fn state(data_source_id: Option<DataSourceId>) -> WorkflowState {
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
            data_source_id,
            AnalysisMode::Standard,
        )
    }

    fn orchestrator(
        llm: Arc<dyn qflow_llm::Llm>,
        backend: Arc<StubBackend>,
    ) -> Orchestrator<StubBackend> {
        let deps = qflow_agents::AgentDeps {
            llm,
            schema_registry: Arc::new(EmptyRegistry),
            executor_backend: backend,
            config: Arc::new(qflow_core::Config::default()),
        };
        Orchestrator::new(deps, Arc::new(MetricsRecorder::new()))
    }

    #[tokio::test]
    async fn conversational_turn_completes_without_touching_executor() {
        let llm = Arc::new(qflow_llm::StubLlm::new(CompletionResult::text(
            "stub",
            "please connect a data source first",
            UsageMetadata::default(),
        )));
        let orch = orchestrator(llm, Arc::new(StubBackend::empty()));
        let (session, mut rx) = StreamingSession::new(16);
        let result = orch.run(state(None), None, &session, CancellationToken::new()).await;
        assert_eq!(result.stage, Stage::Complete);
        let mut frames = Vec::new();
        while let Ok(envelope) = rx.try_recv() {
            frames.push(envelope.frame);
        }
        assert!(matches!(frames[0], Frame::Start { .. }));
        assert!(frames.iter().any(|f| matches!(f, Frame::Complete { .. })));
    }

    #[tokio::test]
    async fn happy_path_drives_every_stage_to_completion() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            CompletionResult::text(
                "stub",
                r#"{"primaryAgent": "nl2sql", "strategy": "sequential", "confidence": 0.9}"#,
                UsageMetadata::default(),
            ),
            CompletionResult::text("stub", "SELECT COUNT(*) FROM customers", UsageMetadata::default()),
            CompletionResult::text(
                "stub",
                r#"{"insights": [{"title": "Growth", "description": "Up"}], "recommendations": []}"#,
                UsageMetadata::default(),
            ),
        ]));
        let backend = Arc::new(StubBackend::single_row(&[("n", CellValue::Number(3.0))]));
        let orch = orchestrator(llm, backend);
        let (session, mut rx) = StreamingSession::new(32);
        let result = orch
            .run(state(Some(DataSourceId::new("ds1"))), Some(data_source()), &session, CancellationToken::new())
            .await;
        assert_eq!(result.stage, Stage::Complete);
        assert_eq!(result.progress.percentage, 100);
        assert!(!result.insights.is_empty());

        let mut saw_complete = false;
        let mut saw_insights = false;
        while let Ok(envelope) = rx.try_recv() {
            match envelope.frame {
                Frame::Complete { .. } => saw_complete = true,
                Frame::Insights { .. } => saw_insights = true,
                _ => {}
            }
        }
        assert!(saw_complete);
        assert!(saw_insights);
    }

    #[tokio::test]
    async fn a_rejected_sql_statement_recovers_by_re_prompting_nl2sql() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            CompletionResult::text(
                "stub",
                r#"{"primaryAgent": "nl2sql", "strategy": "sequential", "confidence": 0.9}"#,
                UsageMetadata::default(),
            ),
            CompletionResult::text("stub", "SELECT * FROM SELECT", UsageMetadata::default()),
            CompletionResult::text("stub", "SELECT * FROM customers", UsageMetadata::default()),
            CompletionResult::text(
                "stub",
                r#"{"insights": [], "recommendations": []}"#,
                UsageMetadata::default(),
            ),
        ]));
        let backend = Arc::new(StubBackend::single_row(&[("n", CellValue::Number(3.0))]));
        let orch = orchestrator(llm, backend);
        let (session, _rx) = StreamingSession::new(32);
        let result = orch
            .run(state(Some(DataSourceId::new("ds1"))), Some(data_source()), &session, CancellationToken::new())
            .await;
        assert_eq!(result.stage, Stage::Complete);
        assert_eq!(result.execution_metadata.retries.get("SqlGenerated"), Some(&1));
    }

    #[tokio::test]
    async fn cancellation_sends_the_run_to_failed() {
        let llm = Arc::new(qflow_llm::StubLlm::new(CompletionResult::empty_response("stub")));
        let orch = orchestrator(llm, Arc::new(StubBackend::empty()));
        let (session, _rx) = StreamingSession::new(16);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = orch
            .run(state(Some(DataSourceId::new("ds1"))), Some(data_source()), &session, cancel)
            .await;
        assert_eq!(result.stage, Stage::Failed);
    }
}
