use serde::{Deserialize, Serialize};

use crate::ids::DataSourceId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceKind {
    Postgres,
    MySql,
    ClickHouse,
    Snowflake,
    BigQuery,
    Redshift,
    DuckDb,
    Sqlite,
    File,
}

/// SQL dialect of a backend store. Distinct from `DataSourceKind` because several
/// kinds can share a dialect family (e.g. a `File`-backed DuckDB source still
/// speaks the `duckdb` dialect).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    Postgres,
    MySql,
    ClickHouse,
    Snowflake,
    BigQuery,
    Redshift,
    DuckDb,
    Sqlite,
    Tsql,
    Spark,
}

/// Opaque connection descriptor; the core never inspects its contents, only passes
/// it to the pluggable executor backend for the matching `DataSourceKind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDescriptor(pub serde_json::Value);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    pub id: DataSourceId,
    pub kind: DataSourceKind,
    pub dialect: Dialect,
    pub connection: ConnectionDescriptor,
    pub schema_fingerprint: String,
}
