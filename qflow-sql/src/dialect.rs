pub use qflow_core::Dialect;

/// Normalizes a loosely-specified dialect name the way the original
/// `DIALECT_MAP` does, so callers can pass whatever string a data-source
/// descriptor carries (`"postgresql"`, `"mssql"`, …) without pre-normalizing it
/// themselves.
pub fn parse_dialect(name: &str) -> Option<Dialect> {
    match name.to_lowercase().as_str() {
        "postgres" | "postgresql" => Some(Dialect::Postgres),
        "mysql" | "mariadb" => Some(Dialect::MySql),
        "clickhouse" => Some(Dialect::ClickHouse),
        "snowflake" => Some(Dialect::Snowflake),
        "bigquery" => Some(Dialect::BigQuery),
        "redshift" => Some(Dialect::Redshift),
        "duckdb" => Some(Dialect::DuckDb),
        "sqlite" => Some(Dialect::Sqlite),
        "sqlserver" | "mssql" | "tsql" => Some(Dialect::Tsql),
        "databricks" | "spark" => Some(Dialect::Spark),
        _ => None,
    }
}

pub fn dialect_name(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::Postgres => "postgres",
        Dialect::MySql => "mysql",
        Dialect::ClickHouse => "clickhouse",
        Dialect::Snowflake => "snowflake",
        Dialect::BigQuery => "bigquery",
        Dialect::Redshift => "redshift",
        Dialect::DuckDb => "duckdb",
        Dialect::Sqlite => "sqlite",
        Dialect::Tsql => "tsql",
        Dialect::Spark => "spark",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_normalize_to_canonical_dialect() {
        assert_eq!(parse_dialect("postgresql"), Some(Dialect::Postgres));
        assert_eq!(parse_dialect("mariadb"), Some(Dialect::MySql));
        assert_eq!(parse_dialect("mssql"), Some(Dialect::Tsql));
        assert_eq!(parse_dialect("databricks"), Some(Dialect::Spark));
    }

    #[test]
    fn unknown_dialect_is_none() {
        assert_eq!(parse_dialect("not-a-real-dialect"), None);
    }
}
