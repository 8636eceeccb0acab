use qflow_core::Plan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    ApiCallsPerMonth,
    AiCredits,
    DataTransferBytesPerMonth,
    StorageBytes,
    Dashboards,
    DataSources,
    Users,
    Projects,
}

#[derive(Debug, thiserror::Error)]
pub enum QuotaError {
    #[error("{resource:?} quota exceeded: {current}+{required} > {limit}")]
    LimitExceeded { resource: ResourceKind, current: u64, required: u64, limit: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaCheck {
    pub allowed: bool,
    /// Set once usage has crossed 80% of the limit, even when the request itself
    /// is still allowed (spec §4.9: emit a warning metric, don't block).
    pub warning: bool,
}

/// Per-plan resource ceilings. `None` means unlimited (Enterprise's usual case).
#[derive(Debug, Clone, Copy)]
pub struct PlanLimits {
    pub api_calls_per_month: Option<u64>,
    pub ai_credits: Option<u64>,
    pub data_transfer_bytes_per_month: Option<u64>,
    pub storage_bytes: Option<u64>,
    pub dashboards: Option<u64>,
    pub data_sources: Option<u64>,
    pub users: Option<u64>,
    pub projects: Option<u64>,
}

impl PlanLimits {
    fn limit_for(&self, resource: ResourceKind) -> Option<u64> {
        match resource {
            ResourceKind::ApiCallsPerMonth => self.api_calls_per_month,
            ResourceKind::AiCredits => self.ai_credits,
            ResourceKind::DataTransferBytesPerMonth => self.data_transfer_bytes_per_month,
            ResourceKind::StorageBytes => self.storage_bytes,
            ResourceKind::Dashboards => self.dashboards,
            ResourceKind::DataSources => self.data_sources,
            ResourceKind::Users => self.users,
            ResourceKind::Projects => self.projects,
        }
    }
}

const FREE: PlanLimits = PlanLimits {
    api_calls_per_month: Some(1_000),
    ai_credits: Some(10),
    data_transfer_bytes_per_month: Some(1 << 30),
    storage_bytes: Some(1 << 30),
    dashboards: Some(3),
    data_sources: Some(1),
    users: Some(1),
    projects: Some(1),
};

const PRO: PlanLimits = PlanLimits {
    api_calls_per_month: Some(100_000),
    ai_credits: Some(1_000),
    data_transfer_bytes_per_month: Some(50 << 30),
    storage_bytes: Some(20 << 30),
    dashboards: Some(50),
    data_sources: Some(5),
    users: Some(10),
    projects: Some(20),
};

const TEAM: PlanLimits = PlanLimits {
    api_calls_per_month: Some(1_000_000),
    ai_credits: Some(10_000),
    data_transfer_bytes_per_month: Some(500 << 30),
    storage_bytes: Some(200 << 30),
    dashboards: Some(500),
    data_sources: Some(25),
    users: Some(100),
    projects: Some(200),
};

const ENTERPRISE: PlanLimits = PlanLimits {
    api_calls_per_month: None,
    ai_credits: None,
    data_transfer_bytes_per_month: None,
    storage_bytes: None,
    dashboards: None,
    data_sources: None,
    users: None,
    projects: None,
};

/// Warning threshold as a fraction of the limit (spec §4.9: 80%).
const WARNING_THRESHOLD: f64 = 0.8;

#[derive(Debug, Default)]
pub struct QuotaManager;

impl QuotaManager {
    pub fn new() -> Self {
        Self
    }

    fn limits_for(&self, plan: Plan) -> PlanLimits {
        match plan {
            Plan::Free => FREE,
            Plan::Pro => PRO,
            Plan::Team => TEAM,
            Plan::Enterprise => ENTERPRISE,
        }
    }

    /// `currentUsage + required <= limit`, per spec §4.9. Unlimited resources
    /// (`None`) always pass with no warning.
    pub fn check(
        &self,
        plan: Plan,
        resource: ResourceKind,
        current_usage: u64,
        required: u64,
    ) -> Result<QuotaCheck, QuotaError> {
        let Some(limit) = self.limits_for(plan).limit_for(resource) else {
            return Ok(QuotaCheck { allowed: true, warning: false });
        };
        let projected = current_usage + required;
        if projected > limit {
            return Err(QuotaError::LimitExceeded { resource, current: current_usage, required, limit });
        }
        let warning = (projected as f64) >= (limit as f64) * WARNING_THRESHOLD;
        Ok(QuotaCheck { allowed: true, warning })
    }
}
