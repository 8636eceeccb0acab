//! LLM Provider Gateway (C1): a uniform completion/function-call interface over
//! multiple model backends, with retry/timeout/backoff applied uniformly via the
//! [`RetryingLlm`] decorator around any [`Llm`] implementation.

mod retry;
mod stub;
mod types;

pub use retry::RetryingLlm;
pub use stub::{ScriptedLlm, StubLlm};
pub use types::{
    CompletionRequest, CompletionResult, FinishReason, FunctionCall, FunctionSchema, LlmError,
    Message, UsageMetadata,
};

use async_trait::async_trait;

/// One model backend. Implementations never `panic!`/throw on a semantic failure
/// (empty response, malformed function call) — those are represented in
/// [`CompletionResult`]. Only transport-level failures (network, 5xx, timeout) are
/// `Err(LlmError)`, and it is exactly those that [`RetryingLlm`] retries.
#[async_trait]
pub trait Llm: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResult, LlmError>;
}
