use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::{CompletionRequest, CompletionResult, Llm, LlmError};

/// Wraps any [`Llm`] with the retry/timeout contract from spec §4.1: exponential
/// backoff, max 3 attempts total, capped per-call wall time (default 30s).
pub struct RetryingLlm<L: Llm> {
    inner: L,
    max_attempts: u32,
    per_call_timeout: Duration,
    base_backoff: Duration,
}

impl<L: Llm> RetryingLlm<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            max_attempts: 3,
            per_call_timeout: Duration::from_secs(30),
            base_backoff: Duration::from_millis(200),
        }
    }

    pub fn with_per_call_timeout(mut self, timeout: Duration) -> Self {
        self.per_call_timeout = timeout;
        self
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        self.base_backoff * 2u32.pow(attempt.saturating_sub(1))
    }
}

#[async_trait]
impl<L: Llm> Llm for RetryingLlm<L> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResult, LlmError> {
        let mut last_err = None;
        for attempt in 1..=self.max_attempts {
            let call = tokio::time::timeout(self.per_call_timeout, self.inner.complete(request.clone_for_retry()));
            match call.await {
                Ok(Ok(result)) => return Ok(result),
                Ok(Err(err)) if err.is_transient() && attempt < self.max_attempts => {
                    warn!(attempt, error = %err, "transient LLM error, retrying");
                    tokio::time::sleep(self.backoff_for(attempt)).await;
                    last_err = Some(err);
                }
                Ok(Err(err)) => return Err(err),
                Err(_elapsed) => {
                    let err = LlmError::Timeout(self.per_call_timeout);
                    if attempt < self.max_attempts {
                        warn!(attempt, "LLM call timed out, retrying");
                        tokio::time::sleep(self.backoff_for(attempt)).await;
                        last_err = Some(err);
                    } else {
                        return Err(err);
                    }
                }
            }
        }
        Err(last_err.unwrap_or(LlmError::Transport("exhausted retries".into())))
    }
}

impl CompletionRequest {
    fn clone_for_retry(&self) -> Self {
        self.clone()
    }
}
