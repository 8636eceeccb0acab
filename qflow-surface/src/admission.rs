use qflow_core::{AnalysisMode, Plan, Tenant};
use qflow_quota::{QuotaManager, RateLimitBackend, RateLimiter, ResourceKind};

use crate::error::{throttled_from, SurfaceError};

/// `deep` analysis is gated behind a paid plan (spec §4.12 step 2: "Check
/// feature access, e.g. advanced_analytics may require Pro plan").
pub fn check_feature_access(tenant: &Tenant, mode: AnalysisMode) -> Result<(), SurfaceError> {
    if mode == AnalysisMode::Deep && tenant.plan == Plan::Free {
        return Err(SurfaceError::Unauthorized(
            "deep analysis requires a Pro plan or higher".into(),
        ));
    }
    Ok(())
}

/// Runs the rate-limit and quota admission checks from spec §4.12 step 3,
/// short-circuiting before any workflow state is built. Neither check
/// consumes credits on denial (spec §7: "quota and rate limit failures
/// short-circuit before orchestration starts").
pub async fn admit<B: RateLimitBackend>(
    rate_limiter: &RateLimiter<B>,
    quota: &QuotaManager,
    identifier: &str,
    tenant: &Tenant,
    estimated_credits: u64,
) -> Result<(), SurfaceError> {
    let decision = rate_limiter.check(identifier, chrono::Utc::now()).await;
    if !decision.allowed {
        return Err(throttled_from(&decision));
    }

    quota
        .check(tenant.effective_plan(chrono::Utc::now()), ResourceKind::AiCredits, tenant.ai_credits_used, estimated_credits)
        .map_err(SurfaceError::from)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qflow_core::TenantId;
    use qflow_quota::InProcessRateLimitBackend;

    fn tenant(plan: Plan) -> Tenant {
        Tenant {
            id: TenantId::new("t1"),
            plan,
            ai_credits_used: 0,
            ai_credits_limit: plan.default_ai_credits(),
            max_projects: 10,
            max_data_sources: 5,
            trial_ends_at: None,
        }
    }

    #[test]
    fn deep_mode_is_rejected_on_free_plan() {
        assert!(check_feature_access(&tenant(Plan::Free), AnalysisMode::Deep).is_err());
    }

    #[test]
    fn deep_mode_is_allowed_on_pro_plan() {
        assert!(check_feature_access(&tenant(Plan::Pro), AnalysisMode::Deep).is_ok());
    }

    #[test]
    fn standard_mode_is_always_allowed() {
        assert!(check_feature_access(&tenant(Plan::Free), AnalysisMode::Standard).is_ok());
    }

    #[tokio::test]
    async fn admission_passes_within_budget() {
        let limiter = RateLimiter::new(InProcessRateLimitBackend::new(), 60, 1000, 10_000, 100);
        let quota = QuotaManager::new();
        let result = admit(&limiter, &quota, "tenant:t1", &tenant(Plan::Pro), 1).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn admission_rejects_quota_exhausted_tenant() {
        let limiter = RateLimiter::new(InProcessRateLimitBackend::new(), 60, 1000, 10_000, 100);
        let quota = QuotaManager::new();
        let mut t = tenant(Plan::Free);
        t.ai_credits_used = 10;
        let result = admit(&limiter, &quota, "tenant:t2", &t, 1).await;
        assert!(matches!(result, Err(SurfaceError::QuotaExceeded { .. })));
    }
}
