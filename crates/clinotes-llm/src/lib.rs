//! Clinotes LLM Provider Layer
//!
//! Hosted-model access for clinical note extraction.
//!
//! # Architecture
//!
//! A [`CompletionProvider`] performs exactly one request against a remote
//! model. The [`ModelClient`] wraps a provider with the per-call timeout,
//! retry and backoff policy from an immutable [`ModelConfig`], and classifies
//! failures into transient (retried) and fatal (returned immediately).
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic scripted provider for testing
//! - `FireworksProvider`: Fireworks AI chat completions (OpenAI-compatible)
//!
//! # Examples
//!
//! ```
//! use clinotes_llm::{CompletionRequest, MockProvider, ModelClient, ModelConfig};
//!
//! # async fn example() -> Result<(), clinotes_llm::LlmError> {
//! let provider = MockProvider::new(r#"{"Chief_Complaint": "cough"}"#);
//! let client = ModelClient::new(provider, ModelConfig::new("key", "test-model"));
//!
//! let text = client.extract(&CompletionRequest::new("Extract fields")).await?;
//! assert!(text.contains("cough"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod fireworks;
pub mod mock;
pub mod provider;
pub mod retry;

use std::time::Duration;
use thiserror::Error;

pub use client::ModelClient;
pub use config::{BackoffPolicy, ModelConfig};
pub use fireworks::FireworksProvider;
pub use mock::MockProvider;
pub use provider::{CompletionProvider, CompletionRequest, RequestOptions};
pub use retry::{RetryMachine, RetryState, Transition};

/// Errors that can occur during LLM operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Missing or invalid credentials, model id or settings; never retried
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network or server-side failure
    #[error("Communication error: {0}")]
    Communication(String),

    /// No response within the configured timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimited {
        /// Server-suggested wait, from `Retry-After`
        retry_after: Option<Duration>,
    },

    /// The request itself was refused (e.g. HTTP 400); retrying will not help
    #[error("Request rejected: {0}")]
    Rejected(String),

    /// The response body could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Transient failures persisted through every retry
    #[error("Model unavailable after {attempts} attempt(s): {last}")]
    Unavailable {
        /// Attempts made, including the first call
        attempts: u32,
        /// The final error observed
        last: Box<LlmError>,
    },
}

/// How a failure should be handled by the retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retry with the generic backoff
    Transient,
    /// Retry with the longer rate-limit backoff
    RateLimit,
    /// Do not retry; affects only the current request
    Permanent,
    /// Do not retry; no subsequent request can succeed either
    Fatal,
}

impl LlmError {
    /// Classify this error for retry handling
    pub fn class(&self) -> ErrorClass {
        match self {
            LlmError::Configuration(_) => ErrorClass::Fatal,
            LlmError::RateLimited { .. } => ErrorClass::RateLimit,
            LlmError::Communication(_) | LlmError::Timeout(_) => ErrorClass::Transient,
            LlmError::Rejected(_) | LlmError::InvalidResponse(_) | LlmError::Unavailable { .. } => {
                ErrorClass::Permanent
            }
        }
    }

    /// Whether a retry may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self.class(), ErrorClass::Transient | ErrorClass::RateLimit)
    }

    /// Whether this error invalidates the whole run
    pub fn is_configuration(&self) -> bool {
        matches!(self, LlmError::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert_eq!(LlmError::Configuration("bad key".into()).class(), ErrorClass::Fatal);
        assert_eq!(
            LlmError::RateLimited { retry_after: None }.class(),
            ErrorClass::RateLimit
        );
        assert_eq!(LlmError::Communication("reset".into()).class(), ErrorClass::Transient);
        assert_eq!(
            LlmError::Timeout(Duration::from_secs(1)).class(),
            ErrorClass::Transient
        );
        assert_eq!(LlmError::Rejected("400".into()).class(), ErrorClass::Permanent);
        assert_eq!(LlmError::InvalidResponse("eof".into()).class(), ErrorClass::Permanent);
    }

    #[test]
    fn test_transient_helpers() {
        assert!(LlmError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(LlmError::RateLimited { retry_after: None }.is_transient());
        assert!(!LlmError::Configuration("x".into()).is_transient());
        assert!(LlmError::Configuration("x".into()).is_configuration());
        assert!(!LlmError::Rejected("x".into()).is_configuration());
    }

    #[test]
    fn test_unavailable_display_includes_cause() {
        let err = LlmError::Unavailable {
            attempts: 4,
            last: Box::new(LlmError::Timeout(Duration::from_secs(30))),
        };
        let text = err.to_string();
        assert!(text.contains("4 attempt"));
        assert!(text.contains("timed out"));
    }
}
