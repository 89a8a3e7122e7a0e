//! Ollama provider, native `/api/chat` endpoint (non-streaming).

use crate::llm::{CompletionParams, LlmClient};
use crate::retry::{with_retry, RetryConfig};
use anyhow::{Context, Result};
use pathos_core::config::LlmConfig;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    retry: RetryConfig,
}

impl OllamaClient {
    /// Base URL precedence: config, `OLLAMA_BASE_URL`, localhost.
    pub fn new(llm: &LlmConfig) -> Result<Self> {
        let base_url = llm
            .base_url
            .clone()
            .or_else(|| env::var("OLLAMA_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(llm.timeout_secs.max(1)))
                .build()?,
            base_url,
            model: llm.model.clone(),
            retry: RetryConfig::from_llm(llm),
        })
    }
}

pub(crate) fn build_payload(model: &str, system: &str, user: &str, params: &CompletionParams) -> Value {
    json!({
        "model": model,
        "messages": [
            {"role": "system", "content": system},
            {"role": "user", "content": user},
        ],
        "stream": false,
        "options": {
            "temperature": params.temperature,
            "num_predict": params.max_tokens,
        },
    })
}

pub(crate) fn parse_response(resp: &Value) -> Result<String> {
    if let Some(err) = resp["error"].as_str() {
        anyhow::bail!("Ollama error: {}", err);
    }
    resp["message"]["content"]
        .as_str()
        .map(|s| s.to_string())
        .context("Ollama response missing message.content")
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    async fn complete(&self, system: &str, user: &str, params: CompletionParams) -> Result<String> {
        let payload = build_payload(&self.model, system, user, &params);
        let url = format!("{}/api/chat", self.base_url);

        let (client, url, payload) = (&self.client, &url, &payload);
        let response = with_retry(&self.retry, "Ollama", || async move {
            client
                .post(url)
                .json(payload)
                .send()
                .await
                .context("Failed to send request to Ollama")
        })
        .await?;

        let body: Value = response.json().await.context("Invalid JSON from Ollama")?;
        parse_response(&body)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let params = CompletionParams {
            max_tokens: 128,
            temperature: 0.5,
        };
        let p = build_payload("llama3", "sys", "hi", &params);
        assert_eq!(p["model"], "llama3");
        assert_eq!(p["messages"][0]["role"], "system");
        assert_eq!(p["messages"][1]["content"], "hi");
        assert_eq!(p["stream"], false);
        assert_eq!(p["options"]["num_predict"], 128);
    }

    #[test]
    fn test_parse_response() {
        let ok = json!({"message": {"role": "assistant", "content": "hello"}, "done": true});
        assert_eq!(parse_response(&ok).unwrap(), "hello");

        let err = json!({"error": "model 'x' not found"});
        assert!(parse_response(&err).unwrap_err().to_string().contains("not found"));

        assert!(parse_response(&json!({})).is_err());
    }

    #[test]
    fn test_base_url_from_config() {
        let llm = LlmConfig {
            base_url: Some("http://gpu-box:11434/".into()),
            ..LlmConfig::default()
        };
        let c = OllamaClient::new(&llm).unwrap();
        assert_eq!(c.base_url, "http://gpu-box:11434");
    }
}
