use regex::Regex;
use std::sync::LazyLock;

/// Top-level statement keywords that mutate or drop data; any of these
/// appearing as the query's leading keyword is rejected before a query ever
/// reaches an executor (spec §4.4: read-only enforcement).
const DANGEROUS_KEYWORDS: &[&str] =
    &["drop", "delete", "truncate", "alter", "create", "insert", "update", "grant", "revoke"];

static LEADING_KEYWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(?:--[^\n]*\n|\s)*([a-zA-Z]+)").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DangerousOperation {
    pub keyword: String,
}

/// Returns the offending keyword if the query's leading statement is a
/// write/DDL operation. Comment lines and leading whitespace are skipped so a
/// query cannot hide a mutation behind a `-- select` comment.
pub fn detect_dangerous_operation(sql: &str) -> Option<DangerousOperation> {
    let leading = LEADING_KEYWORD.captures(sql)?.get(1)?.as_str().to_lowercase();
    DANGEROUS_KEYWORDS.contains(&leading.as_str()).then(|| DangerousOperation { keyword: leading })
}

/// Strips a single trailing semicolon (and any trailing whitespace around it)
/// and collapses internal whitespace runs, matching the original's
/// `_apply_basic_fixes` safety pass.
pub fn normalize_whitespace(sql: &str) -> String {
    let trimmed = sql.trim();
    let trimmed = trimmed.strip_suffix(';').unwrap_or(trimmed).trim_end();
    let mut out = String::with_capacity(trimmed.len());
    let mut last_was_space = false;
    for ch in trimmed.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_top_level_drop() {
        let op = detect_dangerous_operation("DROP TABLE customers").unwrap();
        assert_eq!(op.keyword, "drop");
    }

    #[test]
    fn flags_delete_behind_comment() {
        let op = detect_dangerous_operation("-- cleanup\nDELETE FROM customers").unwrap();
        assert_eq!(op.keyword, "delete");
    }

    #[test]
    fn select_is_not_dangerous() {
        assert!(detect_dangerous_operation("SELECT * FROM customers").is_none());
    }

    #[test]
    fn cte_insert_is_still_flagged_by_leading_keyword() {
        // A leading WITH is not itself in the dangerous list; this documents
        // that CTE-wrapped mutations are the translator/validator's job to
        // catch via `sqlparser`'s statement kind, not this leading-keyword scan.
        assert!(detect_dangerous_operation("WITH x AS (SELECT 1) INSERT INTO y SELECT * FROM x").is_none());
    }

    #[test]
    fn normalize_strips_trailing_semicolon_and_collapses_whitespace() {
        assert_eq!(normalize_whitespace("SELECT   1,\n  2  ;  "), "SELECT 1, 2");
    }
}
