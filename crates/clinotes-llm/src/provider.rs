//! Provider trait and request types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::LlmError;

/// A prompt sent to a model: optional system instructions plus user content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// System instructions
    pub system: Option<String>,

    /// User message
    pub user: String,
}

impl CompletionRequest {
    /// A request with only a user message
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            system: None,
            user: user.into(),
        }
    }

    /// A request with system instructions and a user message
    pub fn with_system(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: Some(system.into()),
            user: user.into(),
        }
    }
}

/// Per-request generation settings, derived from [`crate::ModelConfig`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    /// Remote model identifier
    pub model_id: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Completion token limit
    pub max_tokens: u32,

    /// Ask the provider to constrain output to a JSON object
    pub json_mode: bool,
}

/// A remote model that turns a prompt into text
///
/// Implementations perform a single attempt. Timeouts, retries and backoff
/// belong to [`crate::ModelClient`].
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Request one completion
    async fn complete(
        &self,
        request: &CompletionRequest,
        options: &RequestOptions,
    ) -> Result<String, LlmError>;

    /// Provider name for logs
    fn provider_name(&self) -> &str;
}
