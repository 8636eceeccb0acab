use std::sync::Arc;

use qflow_core::Config;
use qflow_executor::ExecutorBackend;
use qflow_llm::Llm;
use qflow_schema::DataSourceRegistry;

/// Bundle of external collaborators every agent may need, constructed once
/// per request so tests can substitute stubs for every one of them (spec
/// §4.7: "accept C1 and any required collaborators as dependencies, to allow
/// substitution in tests").
pub struct AgentDeps<B: ExecutorBackend> {
    pub llm: Arc<dyn Llm>,
    pub schema_registry: Arc<dyn DataSourceRegistry>,
    pub executor_backend: Arc<B>,
    pub config: Arc<Config>,
}
