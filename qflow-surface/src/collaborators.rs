use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use qflow_core::{ConversationMemory, DataSource, DataSourceId, Tenant, UserRef, WorkflowState};
use qflow_schema::{DataSourceRegistry, Schema, SchemaError};

use crate::error::SurfaceError;

/// Resolves an opaque bearer token into the caller's identity and tenant
/// record. The core never sees tokens or session cookies, only the resolved
/// pair (spec §4.12 step 1).
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<(UserRef, Tenant), SurfaceError>;
}

/// Looks up a data source's connection descriptor by id, fronting whatever
/// directory service owns that mapping outside this workspace.
#[async_trait]
pub trait DataSourceDirectory: Send + Sync {
    async fn resolve(&self, id: &DataSourceId) -> Result<DataSource, SurfaceError>;
}

/// Appends/loads the opaque, externally-owned conversation history
/// `WorkflowState::memory` is a read-only reference to (spec §3).
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn load(&self, conversation_id: &str) -> Option<ConversationMemory>;
    async fn append(&self, conversation_id: &str, state: &WorkflowState);
}

/// Records metered usage once a run completes (spec §4.12 step 7). Never
/// called for a denied admission.
#[async_trait]
pub trait UsageSink: Send + Sync {
    async fn record(&self, record: qflow_core::UsageRecord);
}

/// Fixed-roster identity resolver for local development and tests: tokens are
/// just tenant ids looked up in a static map. A production deployment swaps
/// this for a real auth service without touching anything downstream.
#[derive(Default)]
pub struct StaticIdentityResolver {
    users: HashMap<String, (UserRef, Tenant)>,
}

impl StaticIdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, token: impl Into<String>, user_ref: UserRef, tenant: Tenant) -> Self {
        self.users.insert(token.into(), (user_ref, tenant));
        self
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<(UserRef, Tenant), SurfaceError> {
        self.users
            .get(token)
            .cloned()
            .ok_or_else(|| SurfaceError::Unauthorized("unrecognized bearer token".into()))
    }
}

/// In-process data source directory, analogous in shape to `qflow_cache`'s
/// in-memory fallback: a registered set of connection descriptors keyed by id.
#[derive(Default)]
pub struct InMemoryDataSourceDirectory {
    sources: HashMap<String, DataSource>,
}

impl InMemoryDataSourceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: DataSource) -> Self {
        self.sources.insert(source.id.to_string(), source);
        self
    }
}

#[async_trait]
impl DataSourceDirectory for InMemoryDataSourceDirectory {
    async fn resolve(&self, id: &DataSourceId) -> Result<DataSource, SurfaceError> {
        self.sources
            .get(id.as_ref())
            .cloned()
            .ok_or_else(|| SurfaceError::DataSourceUnavailable(format!("no data source registered for {id}")))
    }
}

/// In-memory conversation memory store, keyed by conversation id. Holds the
/// last state written for a conversation; real deployments back this with
/// durable storage.
#[derive(Default)]
pub struct InMemoryConversationStore {
    memory: RwLock<HashMap<String, ConversationMemory>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn load(&self, conversation_id: &str) -> Option<ConversationMemory> {
        self.memory
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(conversation_id)
            .cloned()
    }

    async fn append(&self, conversation_id: &str, state: &WorkflowState) {
        let snapshot = ConversationMemory(serde_json::json!({
            "last_query": state.query,
            "last_stage": format!("{:?}", state.stage),
        }));
        self.memory
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(conversation_id.to_string(), snapshot);
    }
}

/// Fixed-roster schema registry (C3's external collaborator), keyed by the
/// same data source ids `InMemoryDataSourceDirectory` serves.
#[derive(Default)]
pub struct InMemorySchemaRegistry {
    schemas: HashMap<String, Schema>,
}

impl InMemorySchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, data_source_id: impl Into<String>, schema: Schema) -> Self {
        self.schemas.insert(data_source_id.into(), schema);
        self
    }
}

#[async_trait]
impl DataSourceRegistry for InMemorySchemaRegistry {
    async fn fetch_schema(&self, data_source_id: &str) -> Result<Schema, SchemaError> {
        self.schemas
            .get(data_source_id)
            .cloned()
            .ok_or_else(|| SchemaError::NotFound(data_source_id.to_string()))
    }
}

/// Usage sink that only logs; a real deployment swaps this for a write to the
/// billing/metering pipeline.
#[derive(Default)]
pub struct LoggingUsageSink;

#[async_trait]
impl UsageSink for LoggingUsageSink {
    async fn record(&self, record: qflow_core::UsageRecord) {
        tracing::info!(
            tenant_id = %record.tenant_id,
            user_id = %record.user_id,
            kind = ?record.kind,
            quantity = record.quantity,
            "usage recorded"
        );
    }
}
