use qflow_core::WorkflowState;

/// `(tokens_in + tokens_out) / 1000`, minimum 1 — the Open Question decision
/// recorded in SPEC_FULL.md §9 for both the pre-admission estimate and the
/// post-run debit.
fn credits_from_tokens(tokens_in: u64, tokens_out: u64) -> u64 {
    ((tokens_in + tokens_out) / 1000).max(1)
}

/// Rough pre-admission estimate, before any LLM call has actually run: assumes
/// ~4 characters per token for the user's query and a fixed allowance for the
/// model's response, since no real usage numbers exist yet.
pub fn pre_admission_estimate(query: &str) -> u64 {
    let tokens_in = (query.len() as u64 / 4).max(1);
    let assumed_tokens_out = 500;
    credits_from_tokens(tokens_in, assumed_tokens_out)
}

/// Post-run debit: the actual accumulated usage across every LLM call made
/// during the run, read off `WorkflowState::execution_metadata`.
pub fn actual_cost(state: &WorkflowState) -> u64 {
    credits_from_tokens(state.execution_metadata.total_tokens_in, state.execution_metadata.total_tokens_out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qflow_core::{AnalysisMode, ConversationId, Plan, RequestId, Role, Tenant, TenantId, UserId, UserRef};

    fn state() -> WorkflowState {
        WorkflowState::new(
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
            None,
            AnalysisMode::Standard,
        )
    }

    #[test]
    fn pre_admission_estimate_has_a_floor_of_one() {
        assert_eq!(pre_admission_estimate(""), credits_from_tokens(1, 500));
        assert!(pre_admission_estimate("") >= 1);
    }

    #[test]
    fn actual_cost_reads_accumulated_usage() {
        let mut s = state();
        s.execution_metadata.total_tokens_in = 1500;
        s.execution_metadata.total_tokens_out = 2500;
        assert_eq!(actual_cost(&s), 4);
    }

    #[test]
    fn actual_cost_floors_at_one_even_with_no_usage() {
        assert_eq!(actual_cost(&state()), 1);
    }
}
