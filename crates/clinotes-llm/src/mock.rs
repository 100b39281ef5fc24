//! Mock provider for deterministic testing

use crate::provider::{CompletionProvider, CompletionRequest, RequestOptions};
use crate::LlmError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

type Outcome = Result<String, LlmError>;

#[derive(Debug)]
struct Script {
    needle: String,
    outcomes: VecDeque<Outcome>,
    delay: Option<Duration>,
}

#[derive(Debug, Default)]
struct MockState {
    scripts: Vec<Script>,
    requests: Vec<(CompletionRequest, RequestOptions)>,
}

/// Mock LLM provider for deterministic testing
///
/// Returns pre-configured outcomes without making any network calls. A
/// script applies when the request's user message contains its needle; the
/// first matching script wins. A script with several outcomes plays them in
/// order and then keeps repeating the last one.
///
/// Clones share state, so a test can keep a handle and inspect calls after
/// handing the provider to a client.
///
/// # Examples
///
/// ```
/// use clinotes_llm::{CompletionProvider, CompletionRequest, LlmError, MockProvider, ModelConfig};
///
/// # async fn example() {
/// let provider = MockProvider::new("default");
/// provider.add_response("note-7", r#"{"Plan": "discharge"}"#);
/// provider.add_sequence("note-9", vec![
///     Err(LlmError::Communication("reset".into())),
///     Ok("{}".into()),
/// ]);
///
/// let options = ModelConfig::new("key", "model").request_options();
/// let text = provider
///     .complete(&CompletionRequest::new("text of note-7"), &options)
///     .await
///     .unwrap();
/// assert!(text.contains("discharge"));
/// assert_eq!(provider.call_count(), 1);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            state: Arc::new(Mutex::new(MockState::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Respond with `response` whenever the prompt contains `needle`
    pub fn add_response(&self, needle: impl Into<String>, response: impl Into<String>) {
        self.add_sequence(needle, vec![Ok(response.into())]);
    }

    /// Fail with `error` whenever the prompt contains `needle`
    pub fn add_error(&self, needle: impl Into<String>, error: LlmError) {
        self.add_sequence(needle, vec![Err(error)]);
    }

    /// Play `outcomes` in order for prompts containing `needle`
    pub fn add_sequence(&self, needle: impl Into<String>, outcomes: Vec<Outcome>) {
        self.lock().scripts.push(Script {
            needle: needle.into(),
            outcomes: outcomes.into(),
            delay: None,
        });
    }

    /// Delay responses to prompts containing `needle`
    ///
    /// Applies to the first script registered for that needle, or to the
    /// default response if none exists.
    pub fn add_delay(&self, needle: impl Into<String>, delay: Duration) {
        let needle = needle.into();
        let mut state = self.lock();
        match state.scripts.iter_mut().find(|s| s.needle == needle) {
            Some(script) => script.delay = Some(delay),
            None => state.scripts.push(Script {
                needle,
                outcomes: VecDeque::new(),
                delay: Some(delay),
            }),
        }
    }

    /// Get the number of times complete was called
    pub fn call_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Requests received so far, in call order
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.lock().requests.iter().map(|(r, _)| r.clone()).collect()
    }

    /// Options sent with the most recent request
    pub fn last_options(&self) -> Option<RequestOptions> {
        self.lock().requests.last().map(|(_, o)| o.clone())
    }

    /// Forget recorded requests
    pub fn reset_call_count(&self) {
        self.lock().requests.clear();
    }

    fn next_outcome(&self, request: &CompletionRequest, options: &RequestOptions) -> (Option<Duration>, Outcome) {
        let mut state = self.lock();
        state.requests.push((request.clone(), options.clone()));

        let script = state
            .scripts
            .iter_mut()
            .find(|s| request.user.contains(&s.needle));

        match script {
            Some(script) => {
                let outcome = if script.outcomes.len() > 1 {
                    script.outcomes.pop_front()
                } else {
                    script.outcomes.front().cloned()
                };
                let outcome = outcome.unwrap_or_else(|| Ok(self.default_response.clone()));
                (script.delay, outcome)
            }
            None => (None, Ok(self.default_response.clone())),
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("{}")
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    async fn complete(
        &self,
        request: &CompletionRequest,
        options: &RequestOptions,
    ) -> Result<String, LlmError> {
        let (delay, outcome) = self.next_outcome(request, options);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        outcome
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}
