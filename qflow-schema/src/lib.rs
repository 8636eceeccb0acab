//! Schema Registry & Optimizer (C3): fetches, caches, and prunes schemas to fit a
//! prompt token budget.

mod optimizer;
mod types;

pub use optimizer::{estimate_tokens, optimize};
pub use types::{Column, DataSourceRegistry, FormatStyle, Intent, PrunedSchema, Schema, SchemaError, Table};
