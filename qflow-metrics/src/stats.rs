use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use qflow_core::ErrorCategory;

/// Caps how many samples each per-agent history keeps, so a long-running process
/// never grows this unboundedly (spec §4.11: "bounded histories").
const HISTORY_CAP: usize = 200;

#[derive(Debug, Default, Clone)]
pub struct AgentStats {
    pub success_count: u64,
    pub failure_count: u64,
    pub failures_by_category: HashMap<ErrorCategory, u64>,
    durations: VecDeque<Duration>,
    confidence_scores: VecDeque<f64>,
    field_completion_rates: VecDeque<f64>,
}

impl AgentStats {
    fn push_capped<T>(buf: &mut VecDeque<T>, value: T) {
        if buf.len() >= HISTORY_CAP {
            buf.pop_front();
        }
        buf.push_back(value);
    }

    pub fn record_success(&mut self, duration: Duration, confidence: Option<f64>, field_completion: Option<f64>) {
        self.success_count += 1;
        Self::push_capped(&mut self.durations, duration);
        if let Some(c) = confidence {
            Self::push_capped(&mut self.confidence_scores, c);
        }
        if let Some(f) = field_completion {
            Self::push_capped(&mut self.field_completion_rates, f);
        }
    }

    pub fn record_failure(&mut self, category: ErrorCategory, duration: Duration) {
        self.failure_count += 1;
        *self.failures_by_category.entry(category).or_insert(0) += 1;
        Self::push_capped(&mut self.durations, duration);
    }

    pub fn total_runs(&self) -> u64 {
        self.success_count + self.failure_count
    }

    /// Percentage in `[0.0, 100.0]`; zero when there have been no runs yet.
    pub fn success_rate(&self) -> f64 {
        let total = self.total_runs();
        if total == 0 {
            return 0.0;
        }
        self.success_count as f64 / total as f64 * 100.0
    }

    pub fn average_latency(&self) -> Duration {
        if self.durations.is_empty() {
            return Duration::ZERO;
        }
        let total: Duration = self.durations.iter().sum();
        total / self.durations.len() as u32
    }

    pub fn average_confidence(&self) -> Option<f64> {
        if self.confidence_scores.is_empty() {
            return None;
        }
        Some(self.confidence_scores.iter().sum::<f64>() / self.confidence_scores.len() as f64)
    }

    pub fn average_field_completion(&self) -> Option<f64> {
        if self.field_completion_rates.is_empty() {
            return None;
        }
        Some(self.field_completion_rates.iter().sum::<f64>() / self.field_completion_rates.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_rate_is_zero_with_no_runs() {
        assert_eq!(AgentStats::default().success_rate(), 0.0);
    }

    #[test]
    fn success_rate_reflects_mixed_outcomes() {
        let mut stats = AgentStats::default();
        stats.record_success(Duration::from_millis(10), Some(0.9), Some(1.0));
        stats.record_success(Duration::from_millis(20), Some(0.8), Some(1.0));
        stats.record_failure(ErrorCategory::SqlGeneration, Duration::from_millis(30));
        assert!((stats.success_rate() - 66.666).abs() < 0.01);
        assert_eq!(stats.failures_by_category.get(&ErrorCategory::SqlGeneration), Some(&1));
    }

    #[test]
    fn average_latency_tracks_both_outcomes() {
        let mut stats = AgentStats::default();
        stats.record_success(Duration::from_millis(100), None, None);
        stats.record_failure(ErrorCategory::Timeout, Duration::from_millis(300));
        assert_eq!(stats.average_latency(), Duration::from_millis(200));
    }

    #[test]
    fn history_is_bounded() {
        let mut stats = AgentStats::default();
        for _ in 0..(HISTORY_CAP + 50) {
            stats.record_success(Duration::from_millis(1), Some(1.0), None);
        }
        assert_eq!(stats.durations.len(), HISTORY_CAP);
        assert_eq!(stats.confidence_scores.len(), HISTORY_CAP);
    }
}
