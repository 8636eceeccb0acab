use std::convert::Infallible;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use futures::Stream;
use qflow_core::{
    AnalysisMode, ChartConfig, ConversationId, DataSourceId, Insight, QueryResult, Recommendation,
    RequestId, Stage, UsageKind, UsageRecord, WorkflowState,
};
use qflow_executor::ExecutorBackend;
use qflow_quota::{actual_cost, pre_admission_estimate};
use qflow_stream::StreamingSession;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::admission::{admit, check_feature_access};
use crate::error::SurfaceError;
use crate::state::AppState;

/// How many in-flight frames the bounded channel holds before a non-progress
/// frame would block the sender. Sized generously above one run's frame count
/// (start + one progress per stage + up to four terminal payload frames)
/// so the non-streaming handler, which doesn't drain concurrently, never
/// deadlocks against its own run.
const SESSION_CAPACITY: usize = 64;

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub query: String,
    pub conversation_id: Option<String>,
    pub data_source_id: Option<String>,
    pub analysis_mode: Option<AnalysisMode>,
}

#[derive(Debug, Serialize)]
pub struct ExecutionMetadataView {
    pub execution_time_ms: i64,
    pub status: &'static str,
    pub stage: String,
}

#[derive(Debug, Serialize)]
pub struct ProgressView {
    pub percentage: u8,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub echarts_config: Option<ChartConfig>,
    pub insights: Vec<Insight>,
    pub recommendations: Vec<Recommendation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_result: Option<QueryResult>,
    pub execution_metadata: ExecutionMetadataView,
    pub progress: ProgressView,
    pub ai_engine: String,
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, SurfaceError> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| SurfaceError::Unauthorized("missing or malformed Authorization header".into()))
}

struct Admitted {
    state: WorkflowState,
    data_source: Option<qflow_core::DataSource>,
}

async fn admit_and_build<B: ExecutorBackend + 'static>(
    app: &AppState<B>,
    headers: &HeaderMap,
    body: &AnalyzeRequest,
) -> Result<Admitted, SurfaceError> {
    if body.query.trim().is_empty() {
        return Err(SurfaceError::Validation("query must not be empty".into()));
    }

    let token = bearer_token(headers)?;
    let (user_ref, tenant) = app.identity.resolve(token).await?;

    let analysis_mode = body.analysis_mode.unwrap_or(AnalysisMode::Standard);
    check_feature_access(&tenant, analysis_mode)?;

    let data_source = match &body.data_source_id {
        Some(id) => Some(app.data_sources.resolve(&DataSourceId::new(id.clone())).await?),
        None => None,
    };

    let estimated_credits = pre_admission_estimate(&body.query);
    admit(&app.rate_limiter, &app.quota, tenant.id.as_ref(), &tenant, estimated_credits).await?;

    let conversation_id = match &body.conversation_id {
        Some(id) => ConversationId::new(id.clone()),
        None => ConversationId::generate(),
    };
    let data_source_id = body.data_source_id.clone().map(DataSourceId::new);

    let mut state = WorkflowState::new(
        RequestId::generate(),
        conversation_id.clone(),
        user_ref,
        tenant,
        body.query.clone(),
        data_source_id,
        analysis_mode,
    );
    state.memory = app.conversations.load(conversation_id.as_ref()).await;

    Ok(Admitted { state, data_source })
}

async fn record_completion<B: ExecutorBackend + 'static>(app: &AppState<B>, state: &WorkflowState) {
    app.conversations.append(state.conversation_id.as_ref(), state).await;
    if state.stage != Stage::Complete {
        return;
    }
    let credits = actual_cost(state);
    app.usage
        .record(UsageRecord {
            tenant_id: state.tenant.id.clone(),
            user_id: state.user_ref.id.clone(),
            kind: UsageKind::AiQuery,
            quantity: credits,
            at: Utc::now(),
        })
        .await;
}

fn response_from(state: &WorkflowState, ai_engine: &str, elapsed_ms: i64) -> AnalyzeResponse {
    AnalyzeResponse {
        success: state.stage == Stage::Complete,
        query: state.query.clone(),
        analysis: state.narration.clone(),
        echarts_config: state.echarts_config.clone(),
        insights: state.insights.clone(),
        recommendations: state.recommendations.clone(),
        query_result: state.query_result.clone(),
        execution_metadata: ExecutionMetadataView {
            execution_time_ms: elapsed_ms,
            status: if state.stage == Stage::Complete { "complete" } else { "failed" },
            stage: format!("{:?}", state.stage),
        },
        progress: ProgressView {
            percentage: state.progress.percentage,
            message: format!("{:?}", state.progress.stage),
        },
        ai_engine: ai_engine.to_string(),
    }
}

/// Non-streaming analysis: runs the workflow to completion and returns the
/// §6 response envelope in one shot.
pub async fn analyze<B: ExecutorBackend + 'static>(
    State(app): State<AppState<B>>,
    headers: HeaderMap,
    Json(body): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, SurfaceError> {
    let admitted = admit_and_build(&app, &headers, &body).await?;
    let started = Utc::now();
    let (session, mut rx) = StreamingSession::new(SESSION_CAPACITY);
    let cancel = CancellationToken::new();
    let final_state = app.orchestrator.run(admitted.state, admitted.data_source, &session, cancel).await;
    while rx.try_recv().is_ok() {}

    record_completion(&app, &final_state).await;
    let elapsed_ms = (Utc::now() - started).num_milliseconds();

    if final_state.stage == Stage::Failed {
        if let Some(err) = final_state.error.clone() {
            return Err(SurfaceError::AnalysisFailed(Box::new(err)));
        }
    }
    Ok(Json(response_from(&final_state, &app.config.service_name, elapsed_ms)))
}

/// Streaming analysis: opens an SSE connection and forwards every C10 frame
/// as it is produced, running the workflow concurrently.
pub async fn analyze_stream<B: ExecutorBackend + 'static>(
    State(app): State<AppState<B>>,
    headers: HeaderMap,
    Json(body): Json<AnalyzeRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, SurfaceError> {
    let admitted = admit_and_build(&app, &headers, &body).await?;
    let (session, mut rx) = StreamingSession::new(SESSION_CAPACITY);
    let cancel = CancellationToken::new();

    let app_for_task = app.clone();
    tokio::spawn(async move {
        let final_state =
            app_for_task.orchestrator.run(admitted.state, admitted.data_source, &session, cancel).await;
        record_completion(&app_for_task, &final_state).await;
    });

    let stream = async_stream::stream! {
        while let Some(envelope) = rx.recv().await {
            match serde_json::to_string(&envelope) {
                Ok(json) => yield Ok(Event::default().data(json)),
                Err(err) => {
                    tracing::error!(error = %err, "failed to serialize stream envelope");
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    pub thumbs_up: bool,
}

pub async fn feedback<B: ExecutorBackend + 'static>(
    State(app): State<AppState<B>>,
    Json(body): Json<FeedbackRequest>,
) -> impl IntoResponse {
    app.metrics.record_feedback(body.thumbs_up);
    axum::http::StatusCode::NO_CONTENT
}

pub async fn healthz() -> &'static str {
    "ok"
}
