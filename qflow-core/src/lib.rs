//! Shared types for the qflow analytics orchestration core.
//!
//! This crate has no dependency on any other `qflow-*` crate: it defines the
//! vocabulary (identities, tenancy, data sources, the workflow state machine, the
//! error taxonomy, and process configuration) that every other component imports.

mod config;
mod data_source;
mod error_taxonomy;
mod ids;
mod tenancy;
mod usage;
mod workflow;

pub use config::Config;
pub use data_source::{ConnectionDescriptor, DataSource, DataSourceKind, Dialect};
pub use error_taxonomy::{ClassifiedError, ErrorCategory, ErrorSeverity, Recoverability};
pub use ids::{ConversationId, DataSourceId, RequestId, TenantId, UserId};
pub use tenancy::{Plan, Role, Tenant, UserRef};
pub use usage::{UsageKind, UsageRecord};
pub use workflow::{
    AnalysisMode, CellValue, ChartConfig, ConversationMemory, CoreError, ExecutionMetadata,
    Insight, Progress, QueryResult, Recommendation, Row, RoutingDecision, Stage, WorkflowState,
};
