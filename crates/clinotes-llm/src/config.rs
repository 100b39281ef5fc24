//! Model client configuration

use crate::fireworks::DEFAULT_BASE_URL;
use crate::provider::RequestOptions;
use crate::LlmError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default timeout for a single model call (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default number of retries after the first attempt
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default completion token limit
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Highest accepted sampling temperature
pub const MAX_TEMPERATURE: f32 = 2.0;

/// Delay policy between retries
///
/// Delays grow exponentially: `initial * multiplier^(retry - 1)`, capped at
/// `max_delay_ms`. Rate-limit responses start from the longer
/// `rate_limit_initial_delay_ms`, or from the server's `Retry-After` when that
/// is larger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// First delay after a network error or timeout (milliseconds)
    pub initial_delay_ms: u64,

    /// First delay after a rate-limit response (milliseconds)
    pub rate_limit_initial_delay_ms: u64,

    /// Growth factor per retry
    pub multiplier: u32,

    /// Upper bound for any single delay (milliseconds)
    pub max_delay_ms: u64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 1_000,
            rate_limit_initial_delay_ms: 5_000,
            multiplier: 2,
            max_delay_ms: 60_000,
        }
    }
}

impl BackoffPolicy {
    /// No waiting between retries (tests, local endpoints)
    pub fn none() -> Self {
        Self {
            initial_delay_ms: 0,
            rate_limit_initial_delay_ms: 0,
            multiplier: 1,
            max_delay_ms: 0,
        }
    }

    /// Delay before retry number `retry` (1-based)
    ///
    /// # Examples
    ///
    /// ```
    /// use clinotes_llm::BackoffPolicy;
    /// use std::time::Duration;
    ///
    /// let policy = BackoffPolicy::default();
    /// assert_eq!(policy.delay_for(1, false, None), Duration::from_secs(1));
    /// assert_eq!(policy.delay_for(3, false, None), Duration::from_secs(4));
    /// assert_eq!(policy.delay_for(1, true, None), Duration::from_secs(5));
    /// ```
    pub fn delay_for(&self, retry: u32, rate_limited: bool, retry_after: Option<Duration>) -> Duration {
        let base = if rate_limited {
            self.rate_limit_initial_delay_ms
        } else {
            self.initial_delay_ms
        };
        let factor = u64::from(self.multiplier.max(1)).saturating_pow(retry.saturating_sub(1));
        let mut delay_ms = base.saturating_mul(factor);
        if let Some(server) = retry_after {
            let server_ms = u64::try_from(server.as_millis()).unwrap_or(u64::MAX);
            delay_ms = delay_ms.max(server_ms);
        }
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }
}

/// Settings for talking to the remote model
///
/// Built once at process start and passed by reference; nothing below this
/// layer reads the environment.
#[derive(Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// API key (secret; never serialized or logged)
    #[serde(skip_serializing, default)]
    pub api_key: String,

    /// Remote model identifier
    pub model_id: String,

    /// API base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sampling temperature (0.0 for reproducible output)
    #[serde(default)]
    pub temperature: f32,

    /// Maximum wait per call (milliseconds)
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries after the first attempt for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Completion token limit
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Request JSON-object output from the provider
    #[serde(default = "default_true")]
    pub json_mode: bool,

    /// Delay policy between retries
    #[serde(default)]
    pub backoff: BackoffPolicy,
}

impl ModelConfig {
    /// Configuration with defaults for everything except credentials and model
    pub fn new(api_key: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model_id: model_id.into(),
            base_url: default_base_url(),
            temperature: 0.0,
            timeout_ms: default_timeout_ms(),
            max_retries: DEFAULT_MAX_RETRIES,
            max_tokens: DEFAULT_MAX_TOKENS,
            json_mode: true,
            backoff: BackoffPolicy::default(),
        }
    }

    /// Set the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the retry count
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the backoff policy
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Per-call timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Generation settings sent with every request
    pub fn request_options(&self) -> RequestOptions {
        RequestOptions {
            model_id: self.model_id.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            json_mode: self.json_mode,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), LlmError> {
        if self.api_key.trim().is_empty() {
            return Err(LlmError::Configuration(
                "API key is missing; set API_KEY".to_string(),
            ));
        }
        if self.model_id.trim().is_empty() {
            return Err(LlmError::Configuration(
                "model identifier is missing; set MODEL".to_string(),
            ));
        }
        if !(0.0..=MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(LlmError::Configuration(format!(
                "temperature {} out of range [0.0, {}]",
                self.temperature, MAX_TEMPERATURE
            )));
        }
        if self.timeout_ms == 0 {
            return Err(LlmError::Configuration(
                "timeout must be greater than 0".to_string(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(LlmError::Configuration(
                "max_tokens must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelConfig")
            .field("api_key", &"<redacted>")
            .field("model_id", &self.model_id)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("timeout_ms", &self.timeout_ms)
            .field("max_retries", &self.max_retries)
            .field("max_tokens", &self.max_tokens)
            .field("json_mode", &self.json_mode)
            .field("backoff", &self.backoff)
            .finish()
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_SECS * 1_000
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_true() -> bool {
    true
}
