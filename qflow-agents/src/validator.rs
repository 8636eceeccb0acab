use async_trait::async_trait;
use qflow_core::{ClassifiedError, Stage, WorkflowState};
use qflow_executor::ExecutorBackend;
use qflow_recovery::{classify, ClassificationContext};
use qflow_sql::detect_dangerous_operation;
use regex::Regex;
use std::sync::LazyLock;

use crate::agent::Agent;
use crate::deps::AgentDeps;

const RESERVED_WORDS: &[&str] =
    &["select", "where", "group", "order", "limit", "join", "on", "and", "or", "having"];

static FROM_TABLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bfrom\s+`?([a-zA-Z_][a-zA-Z0-9_]*)`?").unwrap());
static CORRUPTION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)select\s+`[^`]*`\s+and\s+columns").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParenFix {
    None,
    TrimExtraClosing(u32),
    AppendMissingClosing(u32),
}

fn paren_balance(sql: &str) -> i32 {
    let mut balance = 0i32;
    for ch in sql.chars() {
        match ch {
            '(' => balance += 1,
            ')' => balance -= 1,
            _ => {}
        }
    }
    balance
}

fn plan_paren_fix(sql: &str) -> Option<ParenFix> {
    let balance = paren_balance(sql);
    if balance == 0 {
        return Some(ParenFix::None);
    }
    if balance.unsigned_abs() <= 2 {
        if balance < 0 {
            Some(ParenFix::TrimExtraClosing(balance.unsigned_abs()))
        } else {
            Some(ParenFix::AppendMissingClosing(balance.unsigned_abs()))
        }
    } else {
        None
    }
}

fn apply_paren_fix(sql: &str, fix: ParenFix) -> String {
    match fix {
        ParenFix::None => sql.to_string(),
        ParenFix::TrimExtraClosing(n) => {
            let mut out = sql.to_string();
            for _ in 0..n {
                if let Some(pos) = out.rfind(')') {
                    out.remove(pos);
                }
            }
            out
        }
        ParenFix::AppendMissingClosing(n) => {
            let extra = ")".repeat(n as usize);
            if let Some(pos) = sql.to_uppercase().find("FORMAT") {
                format!("{}{}{}", &sql[..pos], extra, &sql[pos..])
            } else {
                format!("{sql}{extra}")
            }
        }
    }
}

/// Purely syntactic, no-execution validation pass (spec §4.7.c). On a bounded
/// parenthesis imbalance it attempts an auto-fix instead of failing outright.
pub struct SqlValidatorAgent;

#[async_trait]
impl<B: ExecutorBackend> Agent<B> for SqlValidatorAgent {
    async fn run(&self, mut state: WorkflowState, _deps: &AgentDeps<B>) -> Result<WorkflowState, ClassifiedError> {
        let context = ClassificationContext { stage: Some("sql_validated".into()) };
        let sql = state
            .sql_query
            .clone()
            .ok_or_else(|| classify("no sql_query to validate", &context))?;

        if !sql.trim_start().to_lowercase().starts_with("select") {
            return Err(classify("query must start with SELECT", &context));
        }

        let table = FROM_TABLE
            .captures(&sql)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .ok_or_else(|| classify("missing FROM clause", &context))?;
        if RESERVED_WORDS.contains(&table.to_lowercase().as_str()) {
            return Err(classify("reserved word used as table name", &context));
        }

        let mut fixed_sql = sql.clone();
        match plan_paren_fix(&sql) {
            Some(fix) => fixed_sql = apply_paren_fix(&sql, fix),
            None => return Err(classify("unbalanced parentheses in query", &context)),
        }

        if let Some(op) = detect_dangerous_operation(&fixed_sql) {
            return Err(classify(&format!("dangerous operation detected: {}", op.keyword), &context));
        }

        if CORRUPTION_PATTERN.is_match(&fixed_sql) {
            return Err(classify("syntax error: known LLM corruption pattern detected", &context));
        }

        state.sql_query = Some(fixed_sql);
        state
            .transition_to(Stage::SqlValidated)
            .map_err(|e| classify(&e.to_string(), &ClassificationContext::default()))?;
        state
            .set_progress(30)
            .map_err(|e| classify(&e.to_string(), &ClassificationContext::default()))?;
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qflow_core::{AnalysisMode, ConversationId, Plan, RequestId, Role, Tenant, TenantId, UserId, UserRef};
    use qflow_executor::StubBackend;
    use std::sync::Arc;

    fn state_with_sql(sql: &str) -> WorkflowState {
        let mut state = WorkflowState::new(
            RequestId::generate(),
            ConversationId::generate(),
            UserRef { id: UserId::new("u1"), role: Role::Analyst },
            Tenant {
                id: TenantId::new("t1"),
                plan: Plan::Pro,
                ai_credits_used: 0,
                ai_credits_limit: Some(1000),
                max_projects: 10,
                max_data_sources: 5,
                trial_ends_at: None,
            },
            "how many customers".into(),
            Some(qflow_core::DataSourceId::new("ds1")),
            AnalysisMode::Standard,
        );
        state.sql_query = Some(sql.to_string());
        state.transition_to(qflow_core::Stage::RoutedToNl2Sql).unwrap();
        state.transition_to(qflow_core::Stage::SqlGenerated).unwrap();
        state
    }

    fn deps() -> AgentDeps<StubBackend> {
        AgentDeps {
            llm: Arc::new(qflow_llm::StubLlm::new(qflow_llm::CompletionResult::empty_response("stub"))),
            schema_registry: Arc::new(crate::test_support::EmptyRegistry),
            executor_backend: Arc::new(StubBackend::empty()),
            config: Arc::new(qflow_core::Config::default()),
        }
    }

    #[tokio::test]
    async fn valid_select_passes_and_advances_progress() {
        let result = SqlValidatorAgent.run(state_with_sql("SELECT COUNT(*) FROM customers"), &deps()).await.unwrap();
        assert_eq!(result.stage, qflow_core::Stage::SqlValidated);
        assert_eq!(result.progress.percentage, 30);
    }

    #[tokio::test]
    async fn auto_fixes_one_extra_closing_paren() {
        let result =
            SqlValidatorAgent.run(state_with_sql("SELECT COUNT(*) FROM customers))"), &deps()).await.unwrap();
        assert_eq!(result.sql_query.as_deref(), Some("SELECT COUNT(*) FROM customers"));
    }

    #[tokio::test]
    async fn non_select_statement_is_rejected_before_reaching_dangerous_op_check() {
        let err = SqlValidatorAgent.run(state_with_sql("DROP TABLE customers"), &deps()).await.unwrap_err();
        // The must-start-with-SELECT check fires first for a bare DROP statement;
        // the dangerous-op scan only matters for a SELECT wrapping a mutation.
        assert_eq!(err.category, qflow_core::ErrorCategory::SqlValidation);
    }

    #[tokio::test]
    async fn reserved_word_as_table_name_is_rejected() {
        let err = SqlValidatorAgent.run(state_with_sql("SELECT * FROM SELECT"), &deps()).await.unwrap_err();
        assert_eq!(err.category, qflow_core::ErrorCategory::SqlValidation);
    }

    #[tokio::test]
    async fn severely_unbalanced_parens_is_rejected() {
        let err =
            SqlValidatorAgent.run(state_with_sql("SELECT * FROM customers)))))"), &deps()).await.unwrap_err();
        assert_eq!(err.category, qflow_core::ErrorCategory::SqlValidation);
    }
}
