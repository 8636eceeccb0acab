use sha2::{Digest, Sha256};
use std::sync::LazyLock;

use regex::Regex;

use qflow_core::AnalysisMode;

static HAS_LIMIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\blimit\s+\d+").unwrap());

/// Appends a default row cap to `Standard`-mode queries that carry none, so a
/// careless "select all the rows" prompt cannot exhaust the executor's row
/// budget by itself (spec §4.4/§4.5: default max rows is enforced at the
/// executor too, this is a cheap head-off at the query-shaping layer).
pub fn inject_default_limit(sql: &str, mode: AnalysisMode, default_max_rows: usize) -> String {
    if mode == AnalysisMode::Deep || HAS_LIMIT.is_match(sql) {
        return sql.to_string();
    }
    format!("{sql} LIMIT {default_max_rows}")
}

/// Stable fingerprint of a (already dialect-translated) query, used as part of
/// the query cache key alongside the data source id (spec §6 `query_key`
/// formula lives in `qflow-cache`; this just gives the translator-side
/// canonical string that feeds it).
pub fn fingerprint(sql: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(sql.as_bytes());
    hex::encode(hasher.finalize())[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_mode_gets_limit_injected() {
        let sql = inject_default_limit("SELECT * FROM orders", AnalysisMode::Standard, 1000);
        assert!(sql.to_uppercase().contains("LIMIT 1000"));
    }

    #[test]
    fn existing_limit_is_not_duplicated() {
        let sql = inject_default_limit("SELECT * FROM orders LIMIT 5", AnalysisMode::Standard, 1000);
        assert_eq!(sql.matches("LIMIT").count(), 1);
    }

    #[test]
    fn deep_mode_never_gets_a_limit_injected() {
        let sql = inject_default_limit("SELECT * FROM orders", AnalysisMode::Deep, 1000);
        assert!(!sql.to_uppercase().contains("LIMIT"));
    }

    #[test]
    fn fingerprint_is_deterministic_and_fixed_length() {
        let a = fingerprint("SELECT 1");
        let b = fingerprint("SELECT 1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn fingerprint_differs_for_different_queries() {
        assert_ne!(fingerprint("SELECT 1"), fingerprint("SELECT 2"));
    }
}
