use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use qflow_core::ClassifiedError;
use serde::Serialize;

use qflow_quota::{QuotaError, RateLimitDecision};

/// Top-level error kinds exposed at the HTTP boundary (spec §7). Every
/// lower-crate error converges here via `From`; no crate below this one knows
/// about HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum SurfaceError {
    #[error("{0}")]
    Validation(String),
    #[error("rate limited, retry after {retry_after_secs}s")]
    Throttled { retry_after_secs: u64 },
    #[error("quota exceeded for {resource}")]
    QuotaExceeded { resource: String, remaining: u64 },
    #[error("{0}")]
    Unauthorized(String),
    #[error("data source unavailable: {0}")]
    DataSourceUnavailable(String),
    #[error("analysis failed")]
    AnalysisFailed(Box<ClassifiedError>),
    #[error("internal error: {0}")]
    Internal(String),
}

impl SurfaceError {
    pub fn kind(&self) -> &'static str {
        match self {
            SurfaceError::Validation(_) => "validation_error",
            SurfaceError::Throttled { .. } => "throttled",
            SurfaceError::QuotaExceeded { .. } => "quota_exceeded",
            SurfaceError::Unauthorized(_) => "unauthorized",
            SurfaceError::DataSourceUnavailable(_) => "data_source_unavailable",
            SurfaceError::AnalysisFailed(_) => "analysis_failed",
            SurfaceError::Internal(_) => "internal_error",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            SurfaceError::Validation(_) => StatusCode::BAD_REQUEST,
            SurfaceError::Throttled { .. } => StatusCode::TOO_MANY_REQUESTS,
            SurfaceError::QuotaExceeded { .. } => StatusCode::PAYMENT_REQUIRED,
            SurfaceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            SurfaceError::DataSourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            SurfaceError::AnalysisFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SurfaceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    classified_error: Option<ClassifiedError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

impl IntoResponse for SurfaceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after = match &self {
            SurfaceError::Throttled { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };
        let classified_error = match &self {
            SurfaceError::AnalysisFailed(err) => Some((**err).clone()),
            _ => None,
        };
        let body = ErrorBody { kind: self.kind(), message: self.to_string(), classified_error, retry_after };
        (status, Json(body)).into_response()
    }
}

impl From<QuotaError> for SurfaceError {
    fn from(err: QuotaError) -> Self {
        match err {
            QuotaError::LimitExceeded { resource, current, limit, .. } => {
                SurfaceError::QuotaExceeded { resource: format!("{resource:?}"), remaining: limit.saturating_sub(current) }
            }
        }
    }
}

impl From<qflow_core::CoreError> for SurfaceError {
    fn from(err: qflow_core::CoreError) -> Self {
        SurfaceError::Internal(err.to_string())
    }
}

impl From<qflow_schema::SchemaError> for SurfaceError {
    fn from(err: qflow_schema::SchemaError) -> Self {
        SurfaceError::DataSourceUnavailable(err.to_string())
    }
}

/// Converts a fail-open sliding-window decision into the §7 shape when the
/// tightest window denies the request.
pub fn throttled_from(decision: &RateLimitDecision) -> SurfaceError {
    SurfaceError::Throttled { retry_after_secs: decision.retry_after.map(|d| d.as_secs()).unwrap_or(1) }
}
