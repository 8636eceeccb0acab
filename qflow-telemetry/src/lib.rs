//! Tracing subscriber and OTLP export initialization, shared by every `qflow-*`
//! binary. Mirrors the teacher's `TelemetryConfig`/`init_with_config` shape:
//! build a config (explicitly or from the environment), call `init`, get a
//! layered `tracing` subscriber with an optional OTLP pipeline attached.

use std::sync::Once;

use opentelemetry::global;
use opentelemetry_sdk::trace::Config as OtelTraceConfig;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("failed to build OTLP exporter: {0}")]
    Otlp(String),
    #[error("telemetry already initialized in this process")]
    AlreadyInitialized,
}

#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
    pub service_name: String,
    pub otlp_endpoint: Option<String>,
    pub log_level: Option<String>,
    pub log_directives: Vec<String>,
}

impl TelemetryConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into(), ..Default::default() }
    }

    pub fn with_otlp(mut self, endpoint: impl Into<String>) -> Self {
        self.otlp_endpoint = Some(endpoint.into());
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = Some(level.into());
        self
    }

    pub fn with_log_directive(mut self, directive: impl Into<String>) -> Self {
        self.log_directives.push(directive.into());
        self
    }

    /// Reads `SERVICE_NAME`, `OTLP_ENDPOINT`, `LOG_LEVEL` the same way
    /// `qflow_core::Config::from_env()` reads its own knobs, so the two can be
    /// constructed side by side at process start without duplicating env parsing
    /// logic elsewhere.
    pub fn from_env() -> Self {
        Self {
            service_name: std::env::var("SERVICE_NAME").unwrap_or_else(|_| "qflow-service".into()),
            otlp_endpoint: std::env::var("OTLP_ENDPOINT").ok(),
            log_level: std::env::var("LOG_LEVEL").ok(),
            log_directives: Vec::new(),
        }
    }

    fn env_filter(&self) -> EnvFilter {
        let base = self.log_level.clone().unwrap_or_else(|| "info".to_string());
        let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(base));
        for directive in &self.log_directives {
            if let Ok(d) = directive.parse() {
                filter = filter.add_directive(d);
            }
        }
        filter
    }
}

/// Initializes the global `tracing` subscriber. Idempotent within a process: a
/// second call is a no-op rather than a panic, since test binaries may call this
/// from multiple integration tests.
pub fn init(config: TelemetryConfig) -> Result<(), TelemetryError> {
    let mut initialized = Ok(());
    INIT.call_once(|| {
        initialized = init_inner(config);
    });
    initialized
}

fn init_inner(config: TelemetryConfig) -> Result<(), TelemetryError> {
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);
    let filter = config.env_filter();

    match &config.otlp_endpoint {
        Some(endpoint) => {
            let tracer = opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(
                    opentelemetry_otlp::new_exporter().tonic().with_endpoint(endpoint.clone()),
                )
                .with_trace_config(OtelTraceConfig::default().with_resource(
                    opentelemetry_sdk::Resource::new(vec![opentelemetry::KeyValue::new(
                        "service.name",
                        config.service_name.clone(),
                    )]),
                ))
                .install_batch(opentelemetry_sdk::runtime::Tokio)
                .map_err(|e| TelemetryError::Otlp(e.to_string()))?;
            let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
            tracing_subscriber::registry().with(filter).with(fmt_layer).with(otel_layer).init();
        }
        None => {
            tracing_subscriber::registry().with(filter).with(fmt_layer).init();
        }
    }
    Ok(())
}

/// Flushes any batched OTLP spans and shuts the global tracer provider down.
/// Call on graceful shutdown (spec §9: "Global singletons ... Process-wide
/// lifecycle: initialize on start, gracefully flush on shutdown").
pub fn shutdown() {
    global::shutdown_tracer_provider();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let cfg = TelemetryConfig::new("qflow-surface")
            .with_log_level("debug")
            .with_log_directive("qflow_sql=trace");
        assert_eq!(cfg.service_name, "qflow-surface");
        assert_eq!(cfg.log_level.as_deref(), Some("debug"));
        assert_eq!(cfg.log_directives, vec!["qflow_sql=trace".to_string()]);
    }

    #[test]
    fn from_env_defaults_when_unset() {
        // SAFETY: test-only env mutation scoped to this process; no other test
        // reads SERVICE_NAME.
        unsafe {
            std::env::remove_var("SERVICE_NAME");
        }
        let cfg = TelemetryConfig::from_env();
        assert_eq!(cfg.service_name, "qflow-service");
    }
}
