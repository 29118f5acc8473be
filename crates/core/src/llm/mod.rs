pub mod anthropic;
pub mod error;
pub mod json;
pub mod prompt;

use crate::domain::analysis::AnalysisRequest;
use crate::llm::error::AnalysisError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Anthropic => f.write_str("anthropic"),
        }
    }
}

/// What a provider returned for one request.
#[derive(Debug, Clone, Default)]
pub struct LlmOutput {
    /// All text segments, concatenated in order.
    pub text: String,
    /// Tool input from structured-output mode, when the model used it.
    pub structured: Option<serde_json::Value>,
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    fn provider(&self) -> Provider;

    /// Sends exactly one request for `request`. Implementations must not retry.
    async fn generate(&self, request: &AnalysisRequest) -> Result<LlmOutput, AnalysisError>;
}
