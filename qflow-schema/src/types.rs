use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    pub tables: Vec<Table>,
}

/// Optional routing hints carried forward from the router agent (e.g. which
/// tables a prior stage already touched), used as an extra pruning signal
/// alongside plain keyword matching (spec §4.3).
#[derive(Debug, Clone, Default)]
pub struct Intent {
    pub hinted_tables: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatStyle {
    Structured,
    Compact,
}

#[derive(Debug, Clone)]
pub struct PrunedSchema {
    pub tables: Vec<Table>,
    pub dropped_tables: Vec<String>,
    pub dropped_columns: Vec<(String, String)>,
}

impl PrunedSchema {
    pub fn format(&self, style: FormatStyle) -> String {
        match style {
            FormatStyle::Structured => {
                let mut out = String::new();
                for table in &self.tables {
                    out.push_str(&format!("table {}:\n", table.name));
                    for column in &table.columns {
                        out.push_str(&format!("  - {} ({})\n", column.name, column.data_type));
                    }
                }
                out
            }
            FormatStyle::Compact => self
                .tables
                .iter()
                .map(|t| {
                    let cols = t.columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(",");
                    format!("{}({})", t.name, cols)
                })
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("data source not found: {0}")]
    NotFound(String),
    #[error("registry unavailable: {0}")]
    Unavailable(String),
}

/// External collaborator: maps a data source id to its full schema. The core
/// treats this as opaque (spec §1: "a data-source registry (id -> connection
/// descriptor)").
#[async_trait]
pub trait DataSourceRegistry: Send + Sync {
    async fn fetch_schema(&self, data_source_id: &str) -> Result<Schema, SchemaError>;
}
