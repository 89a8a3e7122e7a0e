//! OpenAI-compatible `/chat/completions` provider.
//!
//! Works against api.openai.com and any compatible gateway (vLLM, LM Studio,
//! Ollama's `/v1`). The key comes from `OPENAI_API_KEY`.

use crate::llm::{CompletionParams, LlmClient};
use crate::retry::{with_retry, RetryConfig};
use anyhow::{Context, Result};
use pathos_core::config::LlmConfig;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    retry: RetryConfig,
}

impl OpenAiClient {
    pub fn new(llm: &LlmConfig) -> Result<Self> {
        let base_url = llm
            .base_url
            .clone()
            .or_else(|| env::var("OPENAI_BASE_URL").ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let api_key = env::var("OPENAI_API_KEY").ok().filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!("OPENAI_API_KEY not set; requests will be sent without authorization");
        }

        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(llm.timeout_secs.max(1)))
                .build()?,
            api_key,
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
        "temperature": params.temperature,
        "max_tokens": params.max_tokens,
    })
}

pub(crate) fn parse_response(resp: &Value) -> Result<String> {
    if let Some(msg) = resp["error"]["message"].as_str() {
        anyhow::bail!("OpenAI error: {}", msg);
    }
    let choice = &resp["choices"][0];
    if choice.is_null() {
        anyhow::bail!("OpenAI response has no choices");
    }
    Ok(choice["message"]["content"].as_str().unwrap_or_default().to_string())
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, system: &str, user: &str, params: CompletionParams) -> Result<String> {
        let payload = build_payload(&self.model, system, user, &params);
        let url = format!("{}/chat/completions", self.base_url);

        let (client, url, payload, api_key) = (&self.client, &url, &payload, &self.api_key);
        let response = with_retry(&self.retry, "OpenAI", || async move {
            let mut req = client.post(url).json(payload);
            if let Some(key) = api_key {
                req = req.bearer_auth(key);
            }
            req.send().await.context("Failed to send request to OpenAI")
        })
        .await?;

        let body: Value = response.json().await.context("Invalid JSON from OpenAI")?;
        parse_response(&body)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_shape() {
        let p = build_payload("gpt-4o-mini", "sys", "hi", &CompletionParams::default());
        assert_eq!(p["messages"].as_array().unwrap().len(), 2);
        assert_eq!(p["max_tokens"], 512);
    }

    #[test]
    fn test_parse_response() {
        let ok = json!({
            "choices": [{"message": {"role": "assistant", "content": "hey"}, "finish_reason": "stop"}]
        });
        assert_eq!(parse_response(&ok).unwrap(), "hey");

        let err = json!({"error": {"message": "invalid api key", "type": "auth"}});
        assert!(parse_response(&err).unwrap_err().to_string().contains("invalid api key"));

        assert!(parse_response(&json!({"choices": []})).is_err());
    }
}
