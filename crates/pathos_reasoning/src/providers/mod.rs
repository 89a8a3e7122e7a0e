pub mod mock;
pub mod ollama;
pub mod openai;

pub use mock::MockProvider;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use crate::llm::LlmClient;
use anyhow::Result;
use pathos_core::config::LlmConfig;
use std::sync::Arc;

/// Build the configured provider. Unknown names are an error, not a silent mock.
pub fn from_config(llm: &LlmConfig) -> Result<Arc<dyn LlmClient>> {
    let client: Arc<dyn LlmClient> = match llm.provider.to_ascii_lowercase().as_str() {
        "ollama" => Arc::new(OllamaClient::new(llm)?),
        "openai" => Arc::new(OpenAiClient::new(llm)?),
        "mock" => Arc::new(MockProvider::new(&llm.model)),
        other => anyhow::bail!("Unknown LLM provider '{}' (expected ollama, openai or mock)", other),
    };
    tracing::info!(provider = client.name(), model = %llm.model, "LLM provider ready");
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_known_providers() {
        for name in ["ollama", "OpenAI", "mock"] {
            let llm = LlmConfig {
                provider: name.into(),
                ..LlmConfig::default()
            };
            let client = from_config(&llm).unwrap();
            assert_eq!(client.name(), name.to_ascii_lowercase());
        }
    }

    #[test]
    fn test_from_config_unknown_provider() {
        let llm = LlmConfig {
            provider: "carrier-pigeon".into(),
            ..LlmConfig::default()
        };
        let err = from_config(&llm).err().unwrap();
        assert!(err.to_string().contains("carrier-pigeon"));
    }
}
