use std::sync::Arc;

use qflow_agents::AgentDeps;
use qflow_core::Config;
use qflow_executor::StubBackend;
use qflow_llm::{CompletionResult, RetryingLlm, StubLlm, UsageMetadata};
use qflow_metrics::MetricsRecorder;
use qflow_orchestrator::Orchestrator;
use qflow_quota::{InProcessRateLimitBackend, QuotaManager, RateLimiter};
use qflow_surface::{
    AppState, InMemoryConversationStore, InMemoryDataSourceDirectory, InMemorySchemaRegistry,
    LoggingUsageSink, StaticIdentityResolver,
};
use qflow_telemetry::TelemetryConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(Config::from_env());

    let mut telemetry_config = TelemetryConfig::new(&config.service_name).with_log_level(&config.log_level);
    if let Some(endpoint) = &config.otlp_endpoint {
        telemetry_config = telemetry_config.with_otlp(endpoint.clone());
    }
    qflow_telemetry::init(telemetry_config).ok();

    // No real model backend is wired up here (non-goal: production LLM
    // providers); `RetryingLlm` still applies the real retry/backoff policy
    // around whatever `Llm` a deployment plugs in.
    let llm = Arc::new(RetryingLlm::new(StubLlm::new(CompletionResult::text(
        "stub-llm",
        "no model backend configured",
        UsageMetadata::default(),
    ))));
    let schema_registry = Arc::new(InMemorySchemaRegistry::new());
    let executor_backend = Arc::new(StubBackend::empty());

    let deps = AgentDeps { llm, schema_registry, executor_backend, config: config.clone() };
    let metrics = Arc::new(MetricsRecorder::new());
    let orchestrator = Arc::new(Orchestrator::new(deps, metrics.clone()));

    let rate_limiter = Arc::new(RateLimiter::new(
        InProcessRateLimitBackend::new(),
        config.requests_per_minute,
        config.requests_per_hour,
        config.requests_per_day,
        config.burst_limit,
    ));
    let quota = Arc::new(QuotaManager::new());

    let state = AppState {
        config: config.clone(),
        orchestrator,
        rate_limiter,
        quota,
        metrics,
        identity: Arc::new(StaticIdentityResolver::new()),
        data_sources: Arc::new(InMemoryDataSourceDirectory::new()),
        conversations: Arc::new(InMemoryConversationStore::new()),
        usage: Arc::new(LoggingUsageSink),
    };

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "qflow-surface listening");

    axum::serve(listener, qflow_surface::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    qflow_telemetry::shutdown();
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
