//! Error types for the completion layer.

use thiserror::Error;

/// Classification of a failed completion call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Too many requests, retry after a delay.
    RateLimit,
    /// Credits or quota exhausted.
    QuotaExceeded,
    /// Missing, invalid or expired API key.
    InvalidApiKey,
    /// The requested model does not exist for this account.
    ModelNotFound,
    /// 5xx from the provider.
    ServerError,
    /// Connection, TLS or timeout failure.
    NetworkError,
    /// The provider answered but the body was not usable.
    InvalidResponse,
    /// Anything else.
    Other,
}

/// Error returned by a completion backend.
#[derive(Error, Debug, Clone)]
#[error("{provider} ({model}): {message}")]
pub struct ReasoningError {
    pub kind: ErrorKind,
    pub message: String,
    pub provider: String,
    pub model: String,
    /// Suggested retry delay in seconds (rate limit responses only).
    pub retry_after_secs: Option<u32>,
}

impl ReasoningError {
    pub fn new(kind: ErrorKind, provider: &str, model: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            provider: provider.to_string(),
            model: model.to_string(),
            retry_after_secs: None,
        }
    }

    pub fn rate_limit(provider: &str, model: &str, retry_after_secs: Option<u32>) -> Self {
        Self {
            retry_after_secs,
            ..Self::new(ErrorKind::RateLimit, provider, model, "rate limit exceeded")
        }
    }

    pub fn quota_exceeded(provider: &str, model: &str) -> Self {
        Self::new(ErrorKind::QuotaExceeded, provider, model, "quota exhausted")
    }

    pub fn invalid_api_key(provider: &str, model: &str) -> Self {
        Self::new(ErrorKind::InvalidApiKey, provider, model, "invalid API key")
    }

    pub fn model_not_found(provider: &str, model: &str) -> Self {
        Self::new(ErrorKind::ModelNotFound, provider, model, "model not found")
    }

    pub fn server_error(provider: &str, model: &str, detail: &str) -> Self {
        Self::new(ErrorKind::ServerError, provider, model, format!("server error: {detail}"))
    }

    pub fn network(provider: &str, model: &str, detail: &str) -> Self {
        Self::new(ErrorKind::NetworkError, provider, model, format!("network error: {detail}"))
    }

    pub fn invalid_response(provider: &str, model: &str, detail: &str) -> Self {
        Self::new(ErrorKind::InvalidResponse, provider, model, format!("invalid response: {detail}"))
    }

    /// Whether another attempt might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::RateLimit | ErrorKind::ServerError | ErrorKind::NetworkError
        )
    }

    /// Map an HTTP error status and body to an error.
    pub fn from_status(provider: &str, model: &str, status: u16, body: &str) -> Self {
        let body_lower = body.to_lowercase();
        match status {
            429 if body_lower.contains("quota") || body_lower.contains("credit") => {
                Self::quota_exceeded(provider, model)
            }
            429 => Self::rate_limit(provider, model, parse_retry_delay(body)),
            401 | 403 => Self::invalid_api_key(provider, model),
            404 => Self::model_not_found(provider, model),
            500..=599 => Self::server_error(provider, model, &format!("HTTP {status}")),
            _ => {
                let snippet: String = body.chars().take(200).collect();
                Self::new(
                    ErrorKind::Other,
                    provider,
                    model,
                    format!("HTTP {status}: {snippet}"),
                )
            }
        }
    }
}

/// Parse a retry delay hint ("retryDelay": "4s", "retry in 10 seconds").
fn parse_retry_delay(text: &str) -> Option<u32> {
    for marker in ["retryDelay", "retry in", "retry-after"] {
        if let Some(idx) = text.find(marker) {
            let after = &text[idx + marker.len()..];
            for word in after.split_whitespace().take(4) {
                let clean = word.trim_matches(|c: char| !c.is_ascii_digit() && c != '.');
                if let Ok(secs) = clean.parse::<f64>() {
                    return Some(secs.ceil() as u32);
                }
            }
        }
    }
    None
}
