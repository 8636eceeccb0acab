use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::{CompletionRequest, CompletionResult, Llm, LlmError};

/// A test double returning a fixed response to every call. Used throughout
/// `qflow-agents`/`qflow-orchestrator` tests in place of a network-backed model.
pub struct StubLlm {
    response: CompletionResult,
}

impl StubLlm {
    pub fn new(response: CompletionResult) -> Self {
        Self { response }
    }
}

#[async_trait]
impl Llm for StubLlm {
    fn name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResult, LlmError> {
        Ok(self.response.clone())
    }
}

/// A test double that plays back a fixed script of responses in order, then
/// repeats the last one. Used to test multi-call agents (e.g. retry-with-fix
/// flows) deterministically.
pub struct ScriptedLlm {
    script: Vec<CompletionResult>,
    cursor: AtomicUsize,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedLlm {
    pub fn new(script: Vec<CompletionResult>) -> Self {
        Self { script, cursor: AtomicUsize::new(0), calls: Mutex::new(Vec::new()) }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Llm for ScriptedLlm {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResult, LlmError> {
        self.calls.lock().unwrap().push(request);
        let idx = self.cursor.fetch_add(1, Ordering::SeqCst);
        let response = self
            .script
            .get(idx)
            .or_else(|| self.script.last())
            .cloned()
            .unwrap_or_else(|| CompletionResult::empty_response("scripted"));
        Ok(response)
    }
}
