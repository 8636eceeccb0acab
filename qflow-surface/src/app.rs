use axum::routing::{get, post};
use axum::Router;
use qflow_executor::ExecutorBackend;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{analyze, analyze_stream, feedback, healthz};
use crate::state::AppState;

/// Builds the full request surface: the three workflow-facing endpoints from
/// spec §4.12 plus a health check, wrapped in the teacher's request/response
/// logging layer. The timeout layer only wraps the non-streaming routes — an
/// SSE connection is expected to outlive a single stage's timeout budget.
pub fn router<B: ExecutorBackend + 'static>(state: AppState<B>) -> Router {
    let stage_timeout = std::time::Duration::from_secs(state.config.default_timeout_sec.max(1) * 2);

    let bounded = Router::new()
        .route("/v1/analyze", post(analyze::<B>))
        .route("/v1/feedback", post(feedback::<B>))
        .layer(TimeoutLayer::new(stage_timeout));

    let unbounded = Router::new()
        .route("/v1/analyze/stream", post(analyze_stream::<B>))
        .route("/healthz", get(healthz));

    bounded
        .merge(unbounded)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
