//! Completion backend implementations.

pub mod claude;
pub mod openai;

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{ReasoningError, Result};

/// Per-request timeout applied by the HTTP client.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Maximum retries for transient errors.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Base delay for exponential backoff (milliseconds).
const RETRY_BASE_DELAY_MS: u64 = 1000;

/// A single prompt sent to the reasoning service.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Fixed task framing.
    pub system: String,
    /// Examples plus the batch payload.
    pub user: String,
    /// Upper bound on response tokens.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Ask the provider for a JSON object response when it supports it.
    pub json_mode: bool,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: 2000,
            temperature: 0.0,
            json_mode: true,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Trait for text-completion backends.
///
/// This trait abstracts over the vendor APIs so the same prompts can be sent
/// to either provider, and so tests can swap in a canned backend.
pub trait CompletionBackend: Send + Sync {
    /// Send the prompt and return the raw text of the first response block.
    fn complete(&self, request: &CompletionRequest) -> impl Future<Output = Result<String>> + Send;

    /// Human-readable provider name.
    fn provider(&self) -> &str;

    /// Model identifier used for requests.
    fn model(&self) -> &str;
}

/// Which external reasoning provider to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Anthropic,
    OpenAi,
    None,
}

/// Runtime-selected backend.
pub enum Backend {
    Claude(claude::ClaudeBackend),
    OpenAi(openai::OpenAiBackend),
}

impl Backend {
    /// Build the backend for `kind`, or `None` when no provider is wanted.
    pub fn from_kind(
        kind: ProviderKind,
        api_key: &str,
        model: Option<&str>,
        timeout: Duration,
    ) -> Result<Option<Self>> {
        let backend = match kind {
            ProviderKind::Anthropic => {
                let model = model.unwrap_or(claude::DEFAULT_MODEL);
                Some(Backend::Claude(claude::ClaudeBackend::new(api_key, model, timeout)?))
            }
            ProviderKind::OpenAi => {
                let model = model.unwrap_or(openai::DEFAULT_MODEL);
                Some(Backend::OpenAi(openai::OpenAiBackend::new(api_key, model, timeout)?))
            }
            ProviderKind::None => None,
        };
        Ok(backend)
    }

    /// Send requests to `url` instead of the provider's public endpoint.
    pub fn with_url(self, url: impl Into<String>) -> Self {
        match self {
            Backend::Claude(b) => Backend::Claude(b.with_url(url)),
            Backend::OpenAi(b) => Backend::OpenAi(b.with_url(url)),
        }
    }

    /// Set the number of retries for transient failures.
    pub fn with_max_retries(self, max_retries: u32) -> Self {
        match self {
            Backend::Claude(b) => Backend::Claude(b.with_max_retries(max_retries)),
            Backend::OpenAi(b) => Backend::OpenAi(b.with_max_retries(max_retries)),
        }
    }

    /// Endpoint requests are sent to.
    pub fn url(&self) -> &str {
        match self {
            Backend::Claude(b) => b.url(),
            Backend::OpenAi(b) => b.url(),
        }
    }
}

impl CompletionBackend for Backend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        match self {
            Backend::Claude(b) => b.complete(request).await,
            Backend::OpenAi(b) => b.complete(request).await,
        }
    }

    fn provider(&self) -> &str {
        match self {
            Backend::Claude(b) => b.provider(),
            Backend::OpenAi(b) => b.provider(),
        }
    }

    fn model(&self) -> &str {
        match self {
            Backend::Claude(b) => b.model(),
            Backend::OpenAi(b) => b.model(),
        }
    }
}

/// Calculate exponential backoff delay, capped at 10 seconds.
pub fn calculate_backoff_delay(attempt: u32) -> Duration {
    let delay_ms = RETRY_BASE_DELAY_MS.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay_ms.min(10_000))
}

/// Run `attempt_fn` until it succeeds, fails permanently, or retries run out.
pub(crate) async fn send_with_retry<F, Fut>(max_retries: u32, mut attempt_fn: F) -> Result<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let mut attempt = 0;
    loop {
        match attempt_fn().await {
            Ok(text) => return Ok(text),
            Err(err) if attempt < max_retries && err.is_retryable() => {
                let delay = retry_delay(&err, attempt);
                warn!("{}; retrying in {:?} (attempt {})", err, delay, attempt + 1);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

fn retry_delay(err: &ReasoningError, attempt: u32) -> Duration {
    err.retry_after_secs
        .map(|secs| Duration::from_secs(u64::from(secs)).min(Duration::from_secs(30)))
        .unwrap_or_else(|| calculate_backoff_delay(attempt))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_calculate_backoff_delay() {
        assert_eq!(calculate_backoff_delay(0), Duration::from_millis(1000));
        assert_eq!(calculate_backoff_delay(1), Duration::from_millis(2000));
        assert_eq!(calculate_backoff_delay(2), Duration::from_millis(4000));
        assert_eq!(calculate_backoff_delay(10), Duration::from_millis(10_000));
    }

    #[test]
    fn test_provider_kind_serde() {
        let kind: ProviderKind = serde_json::from_str("\"openai\"").unwrap();
        assert_eq!(kind, ProviderKind::OpenAi);
        assert_eq!(serde_json::to_string(&ProviderKind::None).unwrap(), "\"none\"");
    }

    #[test]
    fn test_from_kind_none() {
        let backend = Backend::from_kind(ProviderKind::None, "", None, Duration::from_secs(1)).unwrap();
        assert!(backend.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_errors_until_exhausted() {
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();

        let result = send_with_retry(2, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ReasoningError::network("Test", "m", "connection failed")) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(result.unwrap_err().kind, crate::ErrorKind::NetworkError);
        // 1s then 2s of backoff.
        assert!(start.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);

        let result = send_with_retry(2, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ReasoningError::invalid_api_key("Test", "m")) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.unwrap_err().kind, crate::ErrorKind::InvalidApiKey);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_rate_limit_hint() {
        let calls = AtomicU32::new(0);
        let start = tokio::time::Instant::now();

        let result = send_with_retry(2, || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    Err(ReasoningError::rate_limit("Test", "m", Some(4)))
                } else {
                    Ok("done".to_string())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(start.elapsed() >= Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_retries_gives_up_immediately() {
        let calls = AtomicU32::new(0);

        let result = send_with_retry(0, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(ReasoningError::server_error("Test", "m", "HTTP 503")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
