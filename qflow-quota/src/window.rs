use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("rate limit backend unavailable: {0}")]
    BackendUnavailable(String),
}

/// Abstracts the sliding-window counter store. The in-process fallback below
/// translates the original Redis sorted-set algorithm (`ZADD` + `ZREMRANGEBYSCORE`
/// + `ZCARD` in one pipeline) into a `Mutex<HashMap<_, VecDeque<_>>>`: push `now`,
/// drop everything older than `window`, return the remaining length.
#[async_trait]
pub trait RateLimitBackend: Send + Sync {
    async fn record_and_count(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<u64, RateLimitError>;
}

#[derive(Debug, Default)]
pub struct InProcessRateLimitBackend {
    windows: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
}

impl InProcessRateLimitBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimitBackend for InProcessRateLimitBackend {
    async fn record_and_count(
        &self,
        key: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<u64, RateLimitError> {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let entries = windows.entry(key.to_string()).or_default();
        entries.push_back(now);
        let cutoff = now - window;
        while entries.front().is_some_and(|t| *t <= cutoff) {
            entries.pop_front();
        }
        Ok(entries.len() as u64)
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
    pub retry_after: Option<StdDuration>,
}

/// One named window checked as part of an identifier's overall rate limit
/// (spec §4.9: per-minute, per-hour, per-day, plus a short burst window).
struct NamedWindow {
    suffix: &'static str,
    window: Duration,
    limit: u32,
}

pub struct RateLimiter<B: RateLimitBackend> {
    backend: B,
    windows: [NamedWindow; 4],
}

impl<B: RateLimitBackend> RateLimiter<B> {
    pub fn new(backend: B, per_minute: u32, per_hour: u32, per_day: u32, burst: u32) -> Self {
        Self {
            backend,
            windows: [
                NamedWindow { suffix: "burst", window: Duration::seconds(10), limit: burst },
                NamedWindow { suffix: "minute", window: Duration::minutes(1), limit: per_minute },
                NamedWindow { suffix: "hour", window: Duration::hours(1), limit: per_hour },
                NamedWindow { suffix: "day", window: Duration::days(1), limit: per_day },
            ],
        }
    }

    /// Checks every window for `identifier`, recording `now` in each regardless of
    /// outcome (the original records the attempt even when it is the one that trips
    /// the limit, so the window keeps shrinking back down on its own schedule).
    /// On backend failure, fails open per spec §4.9 ("in-process fallback biased
    /// toward allowing requests").
    pub async fn check(&self, identifier: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let mut tightest: Option<(u32, DateTime<Utc>)> = None;
        let mut denied = false;
        for w in &self.windows {
            let key = format!("{identifier}:{}", w.suffix);
            match self.backend.record_and_count(&key, now, w.window).await {
                Ok(count) => {
                    let remaining = w.limit.saturating_sub(count as u32);
                    let reset_at = now + w.window;
                    if count as u32 > w.limit {
                        denied = true;
                    }
                    let tighter = match tightest {
                        Some((r, _)) => remaining < r,
                        None => true,
                    };
                    if tighter {
                        tightest = Some((remaining, reset_at));
                    }
                }
                Err(_) => continue,
            }
        }
        let (remaining, reset_at) = tightest.unwrap_or((0, now));
        RateLimitDecision {
            allowed: !denied,
            remaining,
            reset_at,
            retry_after: if denied { Some(StdDuration::from_secs(1)) } else { None },
        }
    }
}
