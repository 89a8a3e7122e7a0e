//! Mock provider: deterministic replies for tests and offline runs.

use crate::llm::{CompletionParams, LlmClient};
use anyhow::Result;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug)]
pub struct MockProvider {
    model: String,
    delay: Duration,
    failure: Option<String>,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<(String, String)>>,
}

impl MockProvider {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            delay: Duration::ZERO,
            failure: None,
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// Sleep this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Fail every call with `message`.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The (system, user) pair of the most recent call.
    pub async fn last_prompt(&self) -> Option<(String, String)> {
        self.last_prompt.lock().await.clone()
    }
}

#[async_trait::async_trait]
impl LlmClient for MockProvider {
    async fn complete(&self, system: &str, user: &str, _params: CompletionParams) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().await = Some((system.to_string(), user.to_string()));

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(msg) = &self.failure {
            anyhow::bail!("{}", msg);
        }

        let gist: String = user.chars().take(60).collect();
        Ok(format!("(Mock {} Response) I hear you: \"{}\"", self.model, gist))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
