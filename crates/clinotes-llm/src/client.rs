//! Retrying model client

use crate::config::ModelConfig;
use crate::fireworks::FireworksProvider;
use crate::provider::{CompletionProvider, CompletionRequest};
use crate::retry::{RetryMachine, Transition};
use crate::LlmError;
use tracing::{debug, warn};

/// A provider plus the timeout and retry policy of a [`ModelConfig`]
///
/// The client never reads the environment; all settings come from the
/// configuration handed to [`ModelClient::new`].
pub struct ModelClient<P> {
    provider: P,
    config: ModelConfig,
}

impl<P: CompletionProvider> ModelClient<P> {
    /// Create a client
    pub fn new(provider: P, config: ModelConfig) -> Self {
        Self { provider, config }
    }

    /// The configuration in use
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// The underlying provider
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Send a prompt and return the model's raw text
    ///
    /// Each attempt is bounded by the configured timeout. Transient failures
    /// (network errors, timeouts, 5xx, rate limits) are retried up to
    /// `max_retries` times with backoff; if they persist the result is
    /// [`LlmError::Unavailable`]. [`LlmError::Configuration`] is returned
    /// at once.
    pub async fn extract(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        let options = self.config.request_options();
        let timeout = self.config.timeout();
        let mut machine = RetryMachine::new(self.config.max_retries, &self.config.backoff);
        let mut attempt = machine.start();

        loop {
            let outcome =
                match tokio::time::timeout(timeout, self.provider.complete(request, &options)).await {
                    Ok(result) => result,
                    Err(_) => Err(LlmError::Timeout(timeout)),
                };

            match outcome {
                Ok(text) => {
                    machine.on_success();
                    debug!(
                        provider = self.provider.provider_name(),
                        attempt, "Model call succeeded"
                    );
                    return Ok(text);
                }
                Err(error) => {
                    let message = error.to_string();
                    match machine.on_failure(error) {
                        Transition::Retry(delay) => {
                            warn!(
                                provider = self.provider.provider_name(),
                                attempt,
                                delay_ms = delay.as_millis() as u64,
                                error = %message,
                                "Model call failed, retrying"
                            );
                            tokio::time::sleep(delay).await;
                            attempt = machine.resume();
                        }
                        Transition::GiveUp(error) => {
                            warn!(
                                provider = self.provider.provider_name(),
                                attempt,
                                error = %error,
                                "Model call failed"
                            );
                            return Err(error);
                        }
                    }
                }
            }
        }
    }
}

impl ModelClient<FireworksProvider> {
    /// Client for the Fireworks API described by `config`
    pub fn fireworks(config: ModelConfig) -> Result<Self, LlmError> {
        config.validate()?;
        let provider = FireworksProvider::from_config(&config)?;
        Ok(Self::new(provider, config))
    }
}
