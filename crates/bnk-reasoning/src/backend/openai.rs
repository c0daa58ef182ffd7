//! OpenAI Chat Completions backend.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{send_with_retry, CompletionBackend, CompletionRequest, DEFAULT_MAX_RETRIES};
use crate::{ReasoningError, Result};

const PROVIDER: &str = "OpenAI";
const API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Model used when the configuration does not name one.
pub const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    total_tokens: u32,
}

/// Client for the OpenAI Chat Completions API.
pub struct OpenAiBackend {
    client: reqwest::Client,
    model: String,
    url: String,
    max_retries: u32,
}

impl OpenAiBackend {
    /// Create a backend with the given API key, model and request timeout.
    pub fn new(api_key: &str, model: impl Into<String>, timeout: Duration) -> Result<Self> {
        let model = model.into();

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|_| ReasoningError::invalid_api_key(PROVIDER, &model))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ReasoningError::network(PROVIDER, &model, &e.to_string()))?;

        Ok(Self {
            client,
            model,
            url: API_URL.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Point the client at a compatible endpoint.
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
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request.json_mode.then_some(ResponseFormat {
                format_type: "json_object",
            }),
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

        let data: ChatResponse = response
            .json()
            .await
            .map_err(|e| ReasoningError::invalid_response(PROVIDER, &self.model, &e.to_string()))?;

        if let Some(usage) = &data.usage {
            debug!("{} used {} tokens", PROVIDER, usage.total_tokens);
        }

        data.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| ReasoningError::invalid_response(PROVIDER, &self.model, "empty response"))
    }
}

impl CompletionBackend for OpenAiBackend {
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
    fn test_json_mode_sets_response_format() {
        let body = ChatRequest {
            model: "m",
            messages: vec![],
            temperature: 0.1,
            max_tokens: 10,
            response_format: Some(ResponseFormat {
                format_type: "json_object",
            }),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");

        let body = ChatRequest {
            response_format: None,
            ..body
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn test_response_parse() {
        let raw = r#"{"choices":[{"message":{"content":"{\"results\":[]}"}}],"usage":{"total_tokens":12}}"#;
        let data: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            data.choices[0].message.content.as_deref(),
            Some("{\"results\":[]}")
        );
    }

    #[test]
    fn test_endpoint_and_retry_overrides() {
        let backend = OpenAiBackend::new("sk-test", DEFAULT_MODEL, Duration::from_secs(5)).unwrap();
        assert_eq!(backend.url(), API_URL);
        assert_eq!(backend.max_retries, DEFAULT_MAX_RETRIES);

        let backend = backend.with_url("http://gateway.local/v1/chat/completions").with_max_retries(5);
        assert_eq!(backend.url(), "http://gateway.local/v1/chat/completions");
        assert_eq!(backend.max_retries, 5);
    }
}
