use std::sync::Arc;

use qflow_core::Config;
use qflow_executor::ExecutorBackend;
use qflow_metrics::MetricsRecorder;
use qflow_orchestrator::Orchestrator;
use qflow_quota::{InProcessRateLimitBackend, QuotaManager, RateLimiter};

use crate::collaborators::{ConversationStore, DataSourceDirectory, IdentityResolver, UsageSink};

/// Every collaborator the HTTP layer needs, assembled once at process start
/// and handed to every handler via axum's `State` extractor (spec §4.12:
/// "`Config::from_env()` wiring every other component at startup").
pub struct AppState<B: ExecutorBackend + 'static> {
    pub config: Arc<Config>,
    pub orchestrator: Arc<Orchestrator<B>>,
    pub rate_limiter: Arc<RateLimiter<InProcessRateLimitBackend>>,
    pub quota: Arc<QuotaManager>,
    pub metrics: Arc<MetricsRecorder>,
    pub identity: Arc<dyn IdentityResolver>,
    pub data_sources: Arc<dyn DataSourceDirectory>,
    pub conversations: Arc<dyn ConversationStore>,
    pub usage: Arc<dyn UsageSink>,
}

impl<B: ExecutorBackend + 'static> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            orchestrator: self.orchestrator.clone(),
            rate_limiter: self.rate_limiter.clone(),
            quota: self.quota.clone(),
            metrics: self.metrics.clone(),
            identity: self.identity.clone(),
            data_sources: self.data_sources.clone(),
            conversations: self.conversations.clone(),
            usage: self.usage.clone(),
        }
    }
}
