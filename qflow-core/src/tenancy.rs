use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{TenantId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
    Analyst,
    Employee,
    Viewer,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: UserId,
    pub role: Role,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    Free,
    Pro,
    Team,
    Enterprise,
}

impl Plan {
    /// Default monthly AI credit allotment; `None` means unlimited (enterprise).
    pub fn default_ai_credits(self) -> Option<u64> {
        match self {
            Plan::Free => Some(10),
            Plan::Pro => Some(1_000),
            Plan::Team => Some(10_000),
            Plan::Enterprise => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub plan: Plan,
    pub ai_credits_used: u64,
    pub ai_credits_limit: Option<u64>,
    pub max_projects: u32,
    pub max_data_sources: u32,
    pub trial_ends_at: Option<DateTime<Utc>>,
}

impl Tenant {
    /// Applies trial-expiry downgrade: once `trial_ends_at` has passed, a non-free
    /// plan's limits fall back to `Free`'s, per spec §4.9.
    pub fn effective_plan(&self, now: DateTime<Utc>) -> Plan {
        match self.trial_ends_at {
            Some(end) if end <= now && self.plan != Plan::Free => Plan::Free,
            _ => self.plan,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(plan: Plan, trial_ends_at: Option<DateTime<Utc>>) -> Tenant {
        Tenant {
            id: TenantId::new("t1"),
            plan,
            ai_credits_used: 0,
            ai_credits_limit: plan.default_ai_credits(),
            max_projects: 10,
            max_data_sources: 5,
            trial_ends_at,
        }
    }

    #[test]
    fn enterprise_plan_is_unlimited() {
        assert_eq!(Plan::Enterprise.default_ai_credits(), None);
    }

    #[test]
    fn expired_trial_downgrades_to_free() {
        let past = Utc::now() - chrono::Duration::days(1);
        let t = tenant(Plan::Pro, Some(past));
        assert_eq!(t.effective_plan(Utc::now()), Plan::Free);
    }

    #[test]
    fn active_trial_keeps_plan() {
        let future = Utc::now() + chrono::Duration::days(1);
        let t = tenant(Plan::Pro, Some(future));
        assert_eq!(t.effective_plan(Utc::now()), Plan::Pro);
    }
}
