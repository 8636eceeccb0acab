use qflow_core::{ClassifiedError, ErrorCategory, ErrorSeverity, Recoverability};

/// Context a classifier can fall back on when the error message itself
/// carries no recognizable keyword (e.g. a bare "failed" from a stage that
/// still tells us which agent was running).
#[derive(Debug, Clone, Default)]
pub struct ClassificationContext {
    pub stage: Option<String>,
}

const CRITICAL_PATTERNS: &[&str] = &["out of memory", "connection pool exhausted", "data corruption"];

struct CategoryRule {
    category: ErrorCategory,
    keywords: &'static [&'static str],
}

const CATEGORY_RULES: &[CategoryRule] = &[
    CategoryRule { category: ErrorCategory::SqlGeneration, keywords: &["generate sql", "nl2sql", "prompt"] },
    CategoryRule { category: ErrorCategory::SqlValidation, keywords: &["syntax", "parenthes", "reserved word"] },
    CategoryRule { category: ErrorCategory::SqlExecution, keywords: &["execution failed", "query failed"] },
    CategoryRule { category: ErrorCategory::DataAccess, keywords: &["permission denied"] },
    CategoryRule { category: ErrorCategory::Connection, keywords: &["connection refused", "timeout connecting"] },
    CategoryRule { category: ErrorCategory::Permission, keywords: &["unauthorized", "forbidden"] },
    CategoryRule { category: ErrorCategory::Schema, keywords: &["column", "table", "does not exist"] },
    CategoryRule { category: ErrorCategory::Llm, keywords: &["rate limit", "context length", "model"] },
    CategoryRule { category: ErrorCategory::Timeout, keywords: &["timed out", "deadline exceeded"] },
];

fn category_from_keywords(message: &str) -> Option<ErrorCategory> {
    let lower = message.to_lowercase();
    CATEGORY_RULES.iter().find(|rule| rule.keywords.iter().any(|kw| lower.contains(kw))).map(|rule| rule.category)
}

fn category_from_stage(stage: &str) -> Option<ErrorCategory> {
    let lower = stage.to_lowercase();
    if lower.contains("nl2sql") || lower.contains("sql_generat") {
        Some(ErrorCategory::SqlGeneration)
    } else if lower.contains("valid") {
        Some(ErrorCategory::SqlValidation)
    } else if lower.contains("execut") {
        Some(ErrorCategory::SqlExecution)
    } else {
        None
    }
}

fn subtype_for(category: ErrorCategory, message: &str) -> Option<String> {
    let lower = message.to_lowercase();
    let subtype = match category {
        ErrorCategory::SqlValidation => {
            if lower.contains("parenthes") {
                "unbalanced_parentheses"
            } else if lower.contains("reserved word") {
                "reserved_word_usage"
            } else if lower.contains("dangerous") || lower.contains("drop") || lower.contains("delete") {
                "dangerous_op"
            } else if lower.contains("from") {
                "missing_from_clause"
            } else {
                "syntax_error"
            }
        }
        ErrorCategory::Schema => {
            if lower.contains("column") {
                "column_not_found"
            } else {
                "table_not_found"
            }
        }
        ErrorCategory::SqlExecution => {
            if lower.contains("type") {
                "type_mismatch"
            } else {
                "syntax_error"
            }
        }
        ErrorCategory::Llm => {
            if lower.contains("rate limit") {
                "rate_limit_exceeded"
            } else if lower.contains("empty") {
                "empty_response"
            } else {
                return None;
            }
        }
        _ => return None,
    };
    Some(subtype.to_string())
}

fn severity_for(category: ErrorCategory, subtype: Option<&str>, message: &str) -> ErrorSeverity {
    let lower = message.to_lowercase();
    if CRITICAL_PATTERNS.iter().any(|p| lower.contains(p)) {
        return ErrorSeverity::Critical;
    }
    match (category, subtype) {
        (ErrorCategory::Permission, _) => ErrorSeverity::High,
        (ErrorCategory::SqlValidation, Some("dangerous_op")) => ErrorSeverity::High,
        (ErrorCategory::SqlExecution, _) | (ErrorCategory::Schema, _) => ErrorSeverity::Medium,
        (ErrorCategory::Llm, _) | (ErrorCategory::Connection, _) => ErrorSeverity::Low,
        _ => ErrorSeverity::Medium,
    }
}

fn recoverability_for(category: ErrorCategory, subtype: Option<&str>, severity: ErrorSeverity) -> Recoverability {
    if severity == ErrorSeverity::Critical {
        return Recoverability::None;
    }
    match category {
        ErrorCategory::Permission => Recoverability::Manual,
        ErrorCategory::SqlValidation => match subtype {
            Some("unbalanced_parentheses") | Some("reserved_word_usage") => Recoverability::Automatic,
            _ => Recoverability::Retry,
        },
        ErrorCategory::Connection | ErrorCategory::Llm => Recoverability::Retry,
        ErrorCategory::SqlExecution => match subtype {
            Some("syntax_error") | Some("type_mismatch") => Recoverability::Retry,
            _ => Recoverability::Manual,
        },
        ErrorCategory::Schema => match subtype {
            Some("column_not_found") => Recoverability::Retry,
            _ => Recoverability::Manual,
        },
        _ => Recoverability::Retry,
    }
}

fn suggested_fix_for(recoverability: Recoverability) -> &'static str {
    match recoverability {
        Recoverability::Automatic => "automatic_fix",
        Recoverability::Retry => "retry_with_fixed_sql",
        Recoverability::Manual => "manual_intervention_required",
        Recoverability::None => "manual_intervention_required",
    }
}

fn retry_strategy_for(category: ErrorCategory, recoverability: Recoverability) -> Option<&'static str> {
    match recoverability {
        Recoverability::Retry if category == ErrorCategory::Llm || category == ErrorCategory::Connection => {
            Some("retry_with_backoff")
        }
        Recoverability::Retry if category == ErrorCategory::SqlGeneration => Some("retry_with_simpler_prompt"),
        Recoverability::Retry => Some("retry_with_backoff"),
        _ => None,
    }
}

/// Classifies a raw error message into the taxonomy, falling back to
/// `context.stage` when no keyword matches and finally to `Unknown`.
pub fn classify(message: &str, context: &ClassificationContext) -> ClassifiedError {
    let (category, confident_match) = match category_from_keywords(message) {
        Some(c) => (c, true),
        None => match context.stage.as_deref().and_then(category_from_stage) {
            Some(c) => (c, false),
            None => (ErrorCategory::Unknown, false),
        },
    };

    let subtype = subtype_for(category, message);
    let severity = severity_for(category, subtype.as_deref(), message);
    let recoverability = recoverability_for(category, subtype.as_deref(), severity);

    let confidence = if confident_match && subtype.is_some() {
        0.9
    } else if confident_match {
        0.7
    } else {
        0.5
    };

    ClassifiedError {
        category,
        subtype,
        severity,
        recoverability,
        suggested_fix: Some(suggested_fix_for(recoverability).to_string()),
        retry_strategy: retry_strategy_for(category, recoverability).map(str::to_string),
        confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_pattern_overrides_category_severity() {
        let classified = classify("connection refused: out of memory", &ClassificationContext::default());
        assert_eq!(classified.severity, ErrorSeverity::Critical);
        assert_eq!(classified.recoverability, Recoverability::None);
    }

    #[test]
    fn unbalanced_parentheses_is_automatically_recoverable() {
        let classified = classify("syntax error: unbalanced parentheses in query", &ClassificationContext::default());
        assert_eq!(classified.category, ErrorCategory::SqlValidation);
        assert_eq!(classified.subtype.as_deref(), Some("unbalanced_parentheses"));
        assert_eq!(classified.recoverability, Recoverability::Automatic);
        assert_eq!(classified.confidence, 0.9);
    }

    #[test]
    fn permission_errors_require_manual_intervention() {
        let classified = classify("unauthorized access to resource", &ClassificationContext::default());
        assert_eq!(classified.category, ErrorCategory::Permission);
        assert_eq!(classified.severity, ErrorSeverity::High);
        assert_eq!(classified.recoverability, Recoverability::Manual);
    }

    #[test]
    fn falls_back_to_stage_when_no_keyword_matches() {
        let context = ClassificationContext { stage: Some("sql_validated".to_string()) };
        let classified = classify("something broke", &context);
        assert_eq!(classified.category, ErrorCategory::SqlValidation);
        assert_eq!(classified.confidence, 0.5);
    }

    #[test]
    fn unknown_when_nothing_matches() {
        let classified = classify("something broke", &ClassificationContext::default());
        assert_eq!(classified.category, ErrorCategory::Unknown);
        assert_eq!(classified.confidence, 0.5);
    }

    #[test]
    fn llm_rate_limit_suggests_retry_with_backoff() {
        let classified = classify("LLM rate limit exceeded", &ClassificationContext::default());
        assert_eq!(classified.category, ErrorCategory::Llm);
        assert_eq!(classified.retry_strategy.as_deref(), Some("retry_with_backoff"));
    }

    #[test]
    fn column_not_found_is_retryable_but_table_not_found_is_manual() {
        let column_missing = classify("column foo does not exist", &ClassificationContext::default());
        assert_eq!(column_missing.recoverability, Recoverability::Retry);

        let table_missing = classify("table foo does not exist", &ClassificationContext::default());
        assert_eq!(table_missing.recoverability, Recoverability::Manual);
    }
}
