use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{TenantId, UserId};

/// Metered resource kinds the surface records against the external usage
/// ledger after a run completes (spec §3, §4.12 step 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageKind {
    AiQuery,
    DataTransfer,
    Storage,
}

/// An append-only usage event, persisted via the external `UsageSink`
/// collaborator. Never mutated or deleted once written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub kind: UsageKind,
    pub quantity: u64,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_kind_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&UsageKind::AiQuery).unwrap(), "\"ai_query\"");
        assert_eq!(serde_json::to_string(&UsageKind::DataTransfer).unwrap(), "\"data_transfer\"");
    }
}
