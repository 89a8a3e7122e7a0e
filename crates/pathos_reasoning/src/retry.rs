//! Retry with exponential backoff for provider HTTP calls.
//!
//! Transient failures (429, 408, 5xx, network errors) are retried.
//! Client errors (400, 401, 403, 404) fail on the first attempt.

use anyhow::Result;
use pathos_core::config::LlmConfig;
use reqwest::{Response, StatusCode};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, the first one included.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            backoff_factor: 2.0,
        }
    }
}

impl RetryConfig {
    pub fn from_llm(llm: &LlmConfig) -> Self {
        Self {
            max_attempts: llm.max_retries + 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based), without jitter.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exp = self.backoff_factor.powi(retry.saturating_sub(1) as i32);
        let secs = (self.initial_delay.as_secs_f64() * exp).min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::REQUEST_TIMEOUT
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Run `operation` until it yields a successful response, hits a
/// non-retryable status, or `max_attempts` is spent.
pub async fn with_retry<F, Fut>(config: &RetryConfig, provider: &str, operation: F) -> Result<Response>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Response>>,
{
    let attempts = config.max_attempts.max(1);
    let mut last_error = String::from("no attempt made");

    for attempt in 1..=attempts {
        match operation().await {
            Ok(response) if response.status().is_success() => {
                if attempt > 1 {
                    tracing::info!(provider, attempt, "Request succeeded after retry");
                }
                return Ok(response);
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                if !is_retryable_status(status) {
                    anyhow::bail!("{} API error ({}): {}", provider, status, body);
                }
                tracing::warn!(
                    provider,
                    %status,
                    attempt,
                    max = attempts,
                    "Retryable status: {}",
                    body.chars().take(200).collect::<String>()
                );
                last_error = format!("{} ({}): {}", provider, status, body);
            }
            Err(e) => {
                tracing::warn!(provider, attempt, max = attempts, "Network error: {:#}", e);
                last_error = format!("{}: {:#}", provider, e);
            }
        }

        if attempt < attempts {
            let wait = config.delay_for(attempt) + jitter();
            tracing::debug!(provider, "Retrying in {:.2}s", wait.as_secs_f64());
            tokio::time::sleep(wait).await;
        }
    }

    anyhow::bail!("{} attempts exhausted, last error: {}", attempts, last_error)
}

/// 0-250ms, derived from the clock's sub-second part.
fn jitter() -> Duration {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    Duration::from_millis((nanos % 250) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let cfg = RetryConfig::default();
        assert_eq!(cfg.delay_for(1), Duration::from_millis(500));
        assert_eq!(cfg.delay_for(2), Duration::from_secs(1));
        assert_eq!(cfg.delay_for(3), Duration::from_secs(2));
        assert_eq!(cfg.delay_for(10), Duration::from_secs(8));
    }

    #[test]
    fn test_from_llm_counts_first_attempt() {
        let llm = LlmConfig {
            max_retries: 2,
            ..LlmConfig::default()
        };
        assert_eq!(RetryConfig::from_llm(&llm).max_attempts, 3);
    }

    #[tokio::test]
    async fn test_network_errors_exhaust_attempts() {
        let cfg = RetryConfig {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            backoff_factor: 2.0,
        };
        let calls = AtomicU32::new(0);
        let result = with_retry(&cfg, "test", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<Response, _>(anyhow::anyhow!("connection refused"))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(format!("{}", result.unwrap_err()).contains("connection refused"));
    }
}
