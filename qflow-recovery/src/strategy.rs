use qflow_core::ErrorCategory;

/// Per-`(category, subtype)` retry policy. `subtype: None` matches any
/// subtype of that category not covered by a more specific row.
#[derive(Debug, Clone, Copy)]
pub struct RecoveryStrategy {
    pub max_retries: u32,
    pub backoff_multiplier: f64,
}

const DEFAULT_STRATEGY: RecoveryStrategy = RecoveryStrategy { max_retries: 2, backoff_multiplier: 2.0 };

struct StrategyRow {
    category: ErrorCategory,
    subtype: Option<&'static str>,
    strategy: RecoveryStrategy,
}

const STRATEGY_TABLE: &[StrategyRow] = &[
    StrategyRow {
        category: ErrorCategory::SqlValidation,
        subtype: Some("unbalanced_parentheses"),
        strategy: RecoveryStrategy { max_retries: 1, backoff_multiplier: 1.0 },
    },
    StrategyRow {
        category: ErrorCategory::SqlValidation,
        subtype: None,
        strategy: RecoveryStrategy { max_retries: 2, backoff_multiplier: 1.5 },
    },
    StrategyRow {
        category: ErrorCategory::Llm,
        subtype: Some("rate_limit_exceeded"),
        strategy: RecoveryStrategy { max_retries: 3, backoff_multiplier: 3.0 },
    },
    StrategyRow {
        category: ErrorCategory::Connection,
        subtype: None,
        strategy: RecoveryStrategy { max_retries: 3, backoff_multiplier: 2.0 },
    },
    StrategyRow {
        category: ErrorCategory::SqlExecution,
        subtype: None,
        strategy: RecoveryStrategy { max_retries: 2, backoff_multiplier: 2.0 },
    },
    StrategyRow {
        category: ErrorCategory::Schema,
        subtype: Some("column_not_found"),
        strategy: RecoveryStrategy { max_retries: 1, backoff_multiplier: 1.0 },
    },
];

/// Looks up the retry policy for a classified error, falling back to a
/// conservative default (`qflow_core::Config::retry_budget_per_stage`
/// governs the hard ceiling applied on top of this at the orchestrator).
pub fn strategy_for(category: ErrorCategory, subtype: Option<&str>) -> RecoveryStrategy {
    STRATEGY_TABLE
        .iter()
        .find(|row| row.category == category && row.subtype == subtype)
        .or_else(|| STRATEGY_TABLE.iter().find(|row| row.category == category && row.subtype.is_none()))
        .map(|row| row.strategy)
        .unwrap_or(DEFAULT_STRATEGY)
}

/// Tracks retries already spent for a stage against a strategy's budget.
/// Exceeding the budget means the caller should escalate to manual recovery
/// regardless of what `Recoverability` said (spec §4.6: "A retry budget is
/// tracked per stage ... exceeding it escalates to manual").
pub fn retry_budget_exhausted(retries_so_far: u32, strategy: RecoveryStrategy) -> bool {
    retries_so_far >= strategy.max_retries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specific_subtype_row_wins_over_category_default() {
        let s = strategy_for(ErrorCategory::SqlValidation, Some("unbalanced_parentheses"));
        assert_eq!(s.max_retries, 1);
    }

    #[test]
    fn unmatched_subtype_falls_back_to_category_default() {
        let s = strategy_for(ErrorCategory::SqlValidation, Some("missing_from_clause"));
        assert_eq!(s.max_retries, 2);
        assert_eq!(s.backoff_multiplier, 1.5);
    }

    #[test]
    fn unknown_category_falls_back_to_conservative_default() {
        let s = strategy_for(ErrorCategory::Unknown, None);
        assert_eq!(s.max_retries, DEFAULT_STRATEGY.max_retries);
    }

    #[test]
    fn budget_is_exhausted_at_max_retries() {
        let s = strategy_for(ErrorCategory::Llm, Some("rate_limit_exceeded"));
        assert!(!retry_budget_exhausted(2, s));
        assert!(retry_budget_exhausted(3, s));
    }
}
