use anyhow::Result;
use async_trait::async_trait;
use pathos_core::config::LlmConfig;
use pathos_limbic::SamplingHints;
use std::time::Duration;
use thiserror::Error;

/// Parameters for one completion, modulated by the turn's directive
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionParams {
    /// Maximum tokens to generate (will be clamped to provider limits)
    pub max_tokens: u32,
    /// Sampling temperature (0.0 - 2.0)
    pub temperature: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.7,
        }
    }
}

impl CompletionParams {
    /// Configured base values shifted by the directive's sampling hints.
    pub fn modulated(llm: &LlmConfig, hints: &SamplingHints) -> Self {
        let temperature = (llm.temperature + hints.temperature_delta).clamp(0.0, 2.0);
        let max_tokens = (llm.max_tokens as f32 * hints.max_tokens_factor).round() as u32;
        Self {
            max_tokens: max_tokens.clamp(16, llm.max_tokens.max(16) * 2),
            temperature,
        }
    }
}

/// Why the outbound generation produced no usable text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("provider error: {0}")]
    Provider(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single-shot completion: system prompt plus one user message.
    async fn complete(&self, system: &str, user: &str, params: CompletionParams) -> Result<String>;

    fn name(&self) -> &str;
}
