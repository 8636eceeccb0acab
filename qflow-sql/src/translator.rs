use regex::Regex;
use sqlparser::dialect::{
    ClickHouseDialect, Dialect as SqlparserDialectTrait, GenericDialect, MySqlDialect, PostgreSqlDialect,
    SQLiteDialect, SnowflakeDialect,
};
use sqlparser::parser::Parser;

use crate::dialect::dialect_name;
use crate::safety::{detect_dangerous_operation, normalize_whitespace, DangerousOperation};
use qflow_core::Dialect;

#[derive(Debug, thiserror::Error)]
pub enum SqlError {
    #[error("query blocked: {0} is a write/DDL operation, only read queries are allowed")]
    DangerousOperation(String),
    #[error("failed to parse query for dialect {dialect}: {message}")]
    Unparseable { dialect: String, message: String },
}

#[derive(Debug, Clone)]
pub struct TranslationResult {
    pub sql: String,
    /// True if the parse-and-reserialize path succeeded; false means the
    /// regex substitution fallback table was used unmodified.
    pub parsed: bool,
}

fn sqlparser_dialect_for(dialect: Dialect) -> Box<dyn SqlparserDialectTrait> {
    match dialect {
        Dialect::Postgres | Dialect::Redshift => Box::new(PostgreSqlDialect {}),
        Dialect::MySql => Box::new(MySqlDialect {}),
        Dialect::ClickHouse => Box::new(ClickHouseDialect {}),
        Dialect::Sqlite => Box::new(SQLiteDialect {}),
        Dialect::Snowflake => Box::new(SnowflakeDialect {}),
        Dialect::BigQuery | Dialect::DuckDb | Dialect::Tsql | Dialect::Spark => Box::new(GenericDialect {}),
    }
}

/// One (pattern, replacement) rule in the standard-SQL-to-target-dialect
/// substitution table, applied in order. Grounded directly in the original's
/// `STANDARD_SQL_PATTERNS` table: a small set of well-known portability gaps
/// `sqlparser`'s reserializer does not close by itself (it round-trips the
/// dialect it parsed, it does not rewrite across dialects).
struct Rule {
    pattern: Regex,
    apply: fn(&regex::Captures) -> String,
}

fn concat_to_double_pipe(caps: &regex::Captures) -> String {
    let args = &caps[1];
    args.split(',').map(str::trim).collect::<Vec<_>>().join(" || ")
}

fn double_pipe_to_concat(caps: &regex::Captures) -> String {
    format!("CONCAT({}, {})", caps[1].trim(), caps[2].trim())
}

fn standard_rules_for(dialect: Dialect) -> Vec<Rule> {
    match dialect {
        Dialect::Postgres | Dialect::Redshift | Dialect::Sqlite | Dialect::DuckDb => vec![Rule {
            pattern: Regex::new(r"(?i)CONCAT\s*\(([^)]*)\)").unwrap(),
            apply: concat_to_double_pipe,
        }],
        Dialect::MySql | Dialect::ClickHouse | Dialect::Spark | Dialect::BigQuery | Dialect::Tsql => vec![Rule {
            pattern: Regex::new(r"(\w+|'[^']*')\s*\|\|\s*(\w+|'[^']*')").unwrap(),
            apply: double_pipe_to_concat,
        }],
        Dialect::Snowflake => vec![],
    }
}

fn apply_rules(sql: &str, rules: &[Rule]) -> String {
    let mut out = sql.to_string();
    for rule in rules {
        out = rule.pattern.replace_all(&out, |caps: &regex::Captures| (rule.apply)(caps)).into_owned();
    }
    out
}

/// ClickHouse requires an explicit output format for row-streamed results;
/// append it unless the query already has one (original's ClickHouse
/// `FORMAT JSONEachRow` fixup).
fn apply_clickhouse_format_fixup(sql: &str) -> String {
    if sql.to_uppercase().contains("FORMAT ") {
        sql.to_string()
    } else {
        format!("{sql} FORMAT JSONEachRow")
    }
}

/// Translates a standard-ish SQL query into the target dialect.
///
/// Tries a parse-with-`sqlparser`-then-reserialize pass first (this both
/// validates the query and normalizes whitespace/casing); on parse failure
/// falls back directly to the regex substitution table, since a query that
/// one dialect's grammar rejects may still be valid in a looser one.
pub fn translate(sql: &str, target: Dialect) -> Result<TranslationResult, SqlError> {
    if let Some(DangerousOperation { keyword }) = detect_dangerous_operation(sql) {
        return Err(SqlError::DangerousOperation(keyword));
    }

    let normalized = normalize_whitespace(sql);
    let parser_dialect = sqlparser_dialect_for(target);
    let (mut translated, parsed) = match Parser::parse_sql(parser_dialect.as_ref(), &normalized) {
        Ok(statements) => {
            let rendered =
                statements.iter().map(|s| s.to_string()).collect::<Vec<_>>().join("; ");
            (rendered, true)
        }
        Err(_) => (normalized, false),
    };

    translated = apply_rules(&translated, &standard_rules_for(target));
    if target == Dialect::ClickHouse {
        translated = apply_clickhouse_format_fixup(&translated);
    }

    Ok(TranslationResult { sql: translated, parsed })
}

pub fn validate_translated(sql: &str, target: Dialect) -> Result<(), SqlError> {
    let dialect = sqlparser_dialect_for(target);
    Parser::parse_sql(dialect.as_ref(), sql)
        .map(|_| ())
        .map_err(|e| SqlError::Unparseable { dialect: dialect_name(target).to_string(), message: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dangerous_operation_is_rejected_before_translation() {
        let err = translate("DROP TABLE x", Dialect::Postgres).unwrap_err();
        assert!(matches!(err, SqlError::DangerousOperation(kw) if kw == "drop"));
    }

    #[test]
    fn concat_becomes_double_pipe_for_postgres() {
        let result = translate("SELECT CONCAT(first_name, last_name) FROM users", Dialect::Postgres).unwrap();
        assert!(result.sql.to_lowercase().contains("||") || result.sql.to_lowercase().contains("concat"));
    }

    #[test]
    fn double_pipe_becomes_concat_for_mysql() {
        let result = translate("SELECT first_name || last_name FROM users", Dialect::MySql).unwrap();
        assert!(result.sql.to_uppercase().contains("CONCAT"));
    }

    #[test]
    fn clickhouse_gets_format_fixup_appended() {
        let result = translate("SELECT 1", Dialect::ClickHouse).unwrap();
        assert!(result.sql.contains("FORMAT JSONEachRow"));
    }

    #[test]
    fn clickhouse_format_fixup_is_not_duplicated() {
        let result = translate("SELECT 1 FORMAT JSONEachRow", Dialect::ClickHouse).unwrap();
        assert_eq!(result.sql.matches("FORMAT").count(), 1);
    }

    #[test]
    fn unparseable_query_still_falls_back_to_regex_pipeline() {
        // Deliberately malformed enough to trip sqlparser but still only
        // containing an allowed leading keyword.
        let result = translate("SELECT FROM WHERE", Dialect::Postgres);
        assert!(result.is_ok());
    }
}
