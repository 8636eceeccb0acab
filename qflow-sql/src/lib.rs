//! SQL Dialect Translator & Query Optimizer (C4): normalizes dialect aliases,
//! rejects write/DDL operations, translates portable SQL into a target
//! dialect's quirks, and shapes queries for the row/token budgets enforced
//! elsewhere in the pipeline.

mod dialect;
mod optimizer;
mod safety;
mod translator;

pub use dialect::{dialect_name, parse_dialect};
pub use optimizer::{fingerprint, inject_default_limit};
pub use safety::{detect_dangerous_operation, normalize_whitespace, DangerousOperation};
pub use translator::{translate, validate_translated, SqlError, TranslationResult};

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use qflow_core::Dialect;

    proptest! {
        /// Translation is idempotent: re-translating an already-translated
        /// query into the same dialect does not keep changing it.
        #[test]
        fn translate_is_idempotent(table in "[a-z]{3,8}", column in "[a-z]{3,8}") {
            let sql = format!("SELECT {column} FROM {table}");
            if let Ok(first) = translate(&sql, Dialect::Postgres) {
                if let Ok(second) = translate(&first.sql, Dialect::Postgres) {
                    prop_assert_eq!(first.sql, second.sql);
                }
            }
        }
    }
}
