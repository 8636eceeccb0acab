use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;
use std::time::Duration;

use chrono::{DateTime, Utc};
use qflow_core::ErrorCategory;

use crate::stats::AgentStats;

/// Caps the error-pattern ring buffer (spec §4.11).
const ERROR_HISTORY_CAP: usize = 500;

#[derive(Debug, Clone)]
pub struct ErrorEvent {
    pub agent: String,
    pub category: ErrorCategory,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default)]
struct Satisfaction {
    thumbs_up: u64,
    thumbs_down: u64,
}

impl Satisfaction {
    fn rate(&self) -> Option<f64> {
        let total = self.thumbs_up + self.thumbs_down;
        if total == 0 {
            return None;
        }
        Some(self.thumbs_up as f64 / total as f64 * 100.0)
    }
}

#[derive(Debug, Clone)]
pub struct AggregatedMetrics {
    pub per_agent: HashMap<String, (f64, Duration)>,
    pub worst_performing_agent: Option<String>,
    pub top_error_patterns: Vec<(ErrorCategory, u64)>,
    pub user_satisfaction_rate: Option<f64>,
}

/// Best-effort recorder for per-agent performance and user feedback. Every
/// recording method only ever takes a lock and pushes into a bounded
/// structure — it never performs I/O and never returns an error, so a caller
/// on the orchestration hot path can fire-and-forget without risking a stall
/// (spec §4.11, §9: metrics must never block or fail a run).
#[derive(Default)]
pub struct MetricsRecorder {
    agents: RwLock<HashMap<String, AgentStats>>,
    error_history: RwLock<VecDeque<ErrorEvent>>,
    satisfaction: RwLock<Satisfaction>,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(
        &self,
        agent: &str,
        duration: Duration,
        confidence: Option<f64>,
        field_completion: Option<f64>,
    ) {
        let Ok(mut agents) = self.agents.write() else {
            tracing::warn!("metrics recorder lock poisoned, dropping success sample for {agent}");
            return;
        };
        agents.entry(agent.to_string()).or_default().record_success(duration, confidence, field_completion);
    }

    pub fn record_failure(&self, agent: &str, category: ErrorCategory, message: &str, duration: Duration) {
        if let Ok(mut agents) = self.agents.write() {
            agents.entry(agent.to_string()).or_default().record_failure(category, duration);
        } else {
            tracing::warn!("metrics recorder lock poisoned, dropping failure sample for {agent}");
        }
        if let Ok(mut history) = self.error_history.write() {
            if history.len() >= ERROR_HISTORY_CAP {
                history.pop_front();
            }
            history.push_back(ErrorEvent { agent: agent.to_string(), category, message: message.to_string(), at: Utc::now() });
        }
    }

    pub fn record_feedback(&self, thumbs_up: bool) {
        let Ok(mut satisfaction) = self.satisfaction.write() else { return };
        if thumbs_up {
            satisfaction.thumbs_up += 1;
        } else {
            satisfaction.thumbs_down += 1;
        }
    }

    pub fn aggregate(&self) -> AggregatedMetrics {
        let agents = self.agents.read().map(|g| g.clone()).unwrap_or_default();
        let per_agent: HashMap<String, (f64, Duration)> =
            agents.iter().map(|(name, stats)| (name.clone(), (stats.success_rate(), stats.average_latency()))).collect();

        let worst_performing_agent = agents
            .iter()
            .filter(|(_, stats)| stats.total_runs() > 0)
            .min_by(|(_, a), (_, b)| a.success_rate().partial_cmp(&b.success_rate()).unwrap())
            .map(|(name, _)| name.clone());

        let mut by_category: HashMap<ErrorCategory, u64> = HashMap::new();
        if let Ok(history) = self.error_history.read() {
            for event in history.iter() {
                *by_category.entry(event.category).or_insert(0) += 1;
            }
        }
        let mut top_error_patterns: Vec<_> = by_category.into_iter().collect();
        top_error_patterns.sort_by(|a, b| b.1.cmp(&a.1));
        top_error_patterns.truncate(10);

        let user_satisfaction_rate = self.satisfaction.read().ok().and_then(|s| s.rate());

        AggregatedMetrics { per_agent, worst_performing_agent, top_error_patterns, user_satisfaction_rate }
    }
}
