//! Fireworks AI Provider Implementation
//!
//! Talks to the OpenAI-compatible chat completions endpoint hosted by
//! Fireworks AI. Any server speaking the same protocol can be targeted by
//! changing the base URL.
//!
//! # Examples
//!
//! ```no_run
//! use clinotes_llm::{FireworksProvider, ModelClient, ModelConfig};
//!
//! let config = ModelConfig::new("fw-api-key", "accounts/fireworks/models/llama-v3p3-70b-instruct");
//! let provider = FireworksProvider::from_config(&config).unwrap();
//! let client = ModelClient::new(provider, config);
//! ```

use crate::config::ModelConfig;
use crate::provider::{CompletionProvider, CompletionRequest, RequestOptions};
use crate::LlmError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Default Fireworks inference endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.fireworks.ai/inference/v1";

/// Default model
pub const DEFAULT_MODEL: &str = "accounts/fireworks/models/llama4-maverick-instruct-basic";

/// Models known to follow the extraction prompt well, with a short description
pub const KNOWN_MODELS: &[(&str, &str)] = &[
    (
        "accounts/fireworks/models/llama4-maverick-instruct-basic",
        "Llama 4 Maverick (fast, default)",
    ),
    (
        "accounts/fireworks/models/llama-v3p3-70b-instruct",
        "Llama 3.3 70B Instruct",
    ),
    (
        "accounts/fireworks/models/llama-v3p1-405b-instruct",
        "Llama 3.1 405B Instruct (slow, most capable)",
    ),
];

/// Connection establishment limit; the overall call limit is enforced by the client
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Fireworks AI chat completions provider
pub struct FireworksProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

/// Request body for the chat completions API
#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
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
    kind: &'static str,
}

/// Response from the chat completions API
#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl FireworksProvider {
    /// Create a new provider
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Configuration`] if the API key is blank or the
    /// HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(LlmError::Configuration(
                "API key is missing; set API_KEY".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }

    /// Create a provider from a model configuration
    pub fn from_config(config: &ModelConfig) -> Result<Self, LlmError> {
        Self::new(&config.base_url, &config.api_key)
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionProvider for FireworksProvider {
    async fn complete(
        &self,
        request: &CompletionRequest,
        options: &RequestOptions,
    ) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &request.system {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: &request.user,
        });

        let body = ChatCompletionRequest {
            model: &options.model_id,
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            response_format: options.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Communication(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(classify_status(status, &error_text, &options.model_id, retry_after));
        }

        let text = response
            .text()
            .await
            .map_err(|e| LlmError::Communication(format!("Failed to read response: {}", e)))?;
        let parsed: ChatCompletionResponse = serde_json::from_str(&text)
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("Response contained no content".to_string()))?;

        debug!(chars = content.len(), "Received completion");
        Ok(content)
    }

    fn provider_name(&self) -> &str {
        "fireworks"
    }
}

/// Map a non-success HTTP status to an error
pub fn classify_status(
    status: StatusCode,
    body: &str,
    model_id: &str,
    retry_after: Option<Duration>,
) -> LlmError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Configuration(format!(
            "API key rejected (HTTP {}); check API_KEY",
            status.as_u16()
        )),
        StatusCode::NOT_FOUND => LlmError::Configuration(format!(
            "Model '{}' not found; check MODEL",
            model_id
        )),
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited { retry_after },
        StatusCode::REQUEST_TIMEOUT => {
            LlmError::Communication(format!("HTTP {}: {}", status, body))
        }
        s if s.is_server_error() => LlmError::Communication(format!("HTTP {}: {}", s, body)),
        s => LlmError::Rejected(format!("HTTP {}: {}", s, body)),
    }
}

/// `Retry-After` in seconds; HTTP-date values are ignored
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_provider_creation() {
        let provider = FireworksProvider::new("http://localhost:8080/v1/", "key").unwrap();
        assert_eq!(provider.base_url(), "http://localhost:8080/v1");
        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_blank_key_rejected() {
        let result = FireworksProvider::new(DEFAULT_BASE_URL, "   ");
        assert!(matches!(result, Err(LlmError::Configuration(_))));
    }

    #[test]
    fn test_default_model_is_known() {
        assert!(KNOWN_MODELS.iter().any(|(id, _)| *id == DEFAULT_MODEL));
    }

    #[test]
    fn test_classify_status() {
        let model = "m";
        assert!(classify_status(StatusCode::UNAUTHORIZED, "", model, None).is_configuration());
        assert!(classify_status(StatusCode::FORBIDDEN, "", model, None).is_configuration());
        assert!(classify_status(StatusCode::NOT_FOUND, "", model, None).is_configuration());
        assert_eq!(
            classify_status(
                StatusCode::TOO_MANY_REQUESTS,
                "",
                model,
                Some(Duration::from_secs(3))
            ),
            LlmError::RateLimited {
                retry_after: Some(Duration::from_secs(3))
            }
        );
        assert!(classify_status(StatusCode::SERVICE_UNAVAILABLE, "", model, None).is_transient());
        assert!(classify_status(StatusCode::REQUEST_TIMEOUT, "", model, None).is_transient());
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, "too long", model, None),
            LlmError::Rejected(msg) if msg.contains("too long")
        ));
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(7)));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_communication_error() {
        // Port 9 (discard) is closed on test hosts
        let provider = FireworksProvider::new("http://127.0.0.1:9", "key").unwrap();
        let options = ModelConfig::new("key", "m").request_options();
        let result = provider
            .complete(&CompletionRequest::new("test"), &options)
            .await;
        assert!(matches!(result, Err(LlmError::Communication(_))));
    }
}
