use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionSchema {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub system_prompt: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub model: Option<String>,
    pub function_schema: Option<FunctionSchema>,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            system_prompt: None,
            max_tokens: 1024,
            temperature: 0.2,
            model: None,
            function_schema: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_function_schema(mut self, schema: FunctionSchema) -> Self {
        self.function_schema = Some(schema);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    FunctionCall,
    ContentFilter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub tokens_in: u32,
    pub tokens_out: u32,
}

/// A structured, never-`panic`ked result: semantic failures (empty response,
/// malformed function call) are `ok: false` rather than an `Err`, per spec §4.1
/// ("Never throws on semantic failure; always returns a structured result").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResult {
    pub ok: bool,
    pub kind: Option<String>,
    pub content: Option<String>,
    pub function_call: Option<FunctionCall>,
    pub usage: UsageMetadata,
    pub model: String,
    pub finish_reason: FinishReason,
}

impl CompletionResult {
    pub fn empty_response(model: impl Into<String>) -> Self {
        Self {
            ok: false,
            kind: Some("empty_response".to_string()),
            content: None,
            function_call: None,
            usage: UsageMetadata::default(),
            model: model.into(),
            finish_reason: FinishReason::Stop,
        }
    }

    pub fn text(model: impl Into<String>, content: impl Into<String>, usage: UsageMetadata) -> Self {
        Self {
            ok: true,
            kind: None,
            content: Some(content.into()),
            function_call: None,
            usage,
            model: model.into(),
            finish_reason: FinishReason::Stop,
        }
    }

    pub fn function_call(
        model: impl Into<String>,
        call: FunctionCall,
        usage: UsageMetadata,
    ) -> Self {
        Self {
            ok: true,
            kind: None,
            content: None,
            function_call: Some(call),
            usage,
            model: model.into(),
            finish_reason: FinishReason::FunctionCall,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("upstream returned {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),
}

impl LlmError {
    /// Only transient, transport-level errors are worth retrying (spec §4.1:
    /// "network, 5xx, rate-limit").
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Transport(_) | LlmError::Timeout(_) => true,
            LlmError::Upstream { status, .. } => *status >= 500 || *status == 429,
        }
    }
}
