use serde::{Deserialize, Serialize};

/// Wire-stable category strings (spec §3, §4.6) — part of the external interface
/// contract, never renamed without a version bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    SqlGeneration,
    SqlValidation,
    SqlExecution,
    DataAccess,
    Connection,
    Permission,
    Schema,
    Llm,
    Timeout,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorSeverity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recoverability {
    Automatic,
    Retry,
    Manual,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub category: ErrorCategory,
    pub subtype: Option<String>,
    pub severity: ErrorSeverity,
    pub recoverability: Recoverability,
    pub suggested_fix: Option<String>,
    pub retry_strategy: Option<String>,
    /// Confidence in the classification, 0.0..=1.0.
    pub confidence: f64,
}

impl ClassifiedError {
    /// `criticalFailure` per spec §3: a classified error with no path back into the
    /// workflow.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.recoverability,
            Recoverability::Manual | Recoverability::None
        )
    }
}
