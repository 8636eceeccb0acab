//! Public Request Surface (C12): HTTP admission, streaming, and response
//! shaping around the orchestration core.

mod admission;
mod app;
mod collaborators;
mod error;
mod handlers;
mod state;

pub use app::router;
pub use collaborators::{
    ConversationStore, DataSourceDirectory, IdentityResolver, InMemoryConversationStore,
    InMemoryDataSourceDirectory, InMemorySchemaRegistry, LoggingUsageSink, StaticIdentityResolver, UsageSink,
};
pub use error::SurfaceError;
pub use handlers::{AnalyzeRequest, AnalyzeResponse, FeedbackRequest};
pub use state::AppState;
