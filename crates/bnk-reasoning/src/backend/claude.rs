//! Anthropic Messages API backend.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{send_with_retry, CompletionBackend, CompletionRequest, DEFAULT_MAX_RETRIES};
use crate::{ReasoningError, Result};

const PROVIDER: &str = "Claude";
const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

/// Model used when the configuration does not name one.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-6";

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseContent>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Client for the Anthropic Messages API.
pub struct ClaudeBackend {
    client: reqwest::Client,
    model: String,
    url: String,
    max_retries: u32,
}

impl ClaudeBackend {
    /// Create a backend with the given API key, model and request timeout.
    pub fn new(api_key: &str, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let model = model.into();

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|_| ReasoningError::invalid_api_key(PROVIDER, &model))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .pool_max_idle_per_host(2)
            .build()
            .map_err(|e| ReasoningError::network(PROVIDER, &model, &e.to_string()))?;

        Ok(Self {
            client,
            model,
            url: API_URL.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Point the client at a different endpoint (proxies, test servers).
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the number of retries for transient failures.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Endpoint requests are sent to.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn send_once(&self, request: &CompletionRequest) -> Result<String> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: &request.system,
            messages: vec![Message {
                role: "user",
                content: &request.user,
            }],
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let detail = if e.is_timeout() {
                    "request timed out".to_string()
                } else if e.is_connect() {
                    "connection failed".to_string()
                } else {
                    e.to_string()
                };
                ReasoningError::network(PROVIDER, &self.model, &detail)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReasoningError::from_status(
                PROVIDER,
                &self.model,
                status.as_u16(),
                &body,
            ));
        }

        let data: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ReasoningError::invalid_response(PROVIDER, &self.model, &e.to_string()))?;

        if let Some(usage) = &data.usage {
            debug!(
                "{} used {} input / {} output tokens",
                PROVIDER, usage.input_tokens, usage.output_tokens
            );
        }

        data.content
            .into_iter()
            .find(|c| c.content_type == "text")
            .and_then(|c| c.text)
            .ok_or_else(|| {
                ReasoningError::invalid_response(PROVIDER, &self.model, "no text block in response")
            })
    }
}

impl CompletionBackend for ClaudeBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        send_with_retry(self.max_retries, || self.send_once(request)).await
    }

    fn provider(&self) -> &str {
        PROVIDER
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let body = MessagesRequest {
            model: "m",
            max_tokens: 100,
            temperature: 0.0,
            system: "sys",
            messages: vec![Message {
                role: "user",
                content: "hello",
            }],
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["system"], "sys");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["messages"][0]["content"], "hello");
    }

    #[test]
    fn test_response_parse() {
        let raw = r#"{"content":[{"type":"text","text":"{\"results\":[]}"}],"usage":{"input_tokens":3,"output_tokens":4}}"#;
        let data: MessagesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(data.content[0].text.as_deref(), Some("{\"results\":[]}"));
    }

    #[test]
    fn test_invalid_header_key_rejected() {
        let result = ClaudeBackend::new("bad\nkey", DEFAULT_MODEL, Duration::from_secs(5));
        assert!(result.is_err());
    }

    #[test]
    fn test_endpoint_and_retry_overrides() {
        let backend = ClaudeBackend::new("sk-test", DEFAULT_MODEL, Duration::from_secs(5))
            .unwrap()
            .with_url("http://localhost:9000/v1/messages")
            .with_max_retries(0);
        assert_eq!(backend.url(), "http://localhost:9000/v1/messages");
        assert_eq!(backend.max_retries, 0);
    }
}
