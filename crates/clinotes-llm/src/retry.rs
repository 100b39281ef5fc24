//! Retry state machine for a single extraction request
//!
//! ```text
//! Idle -> Calling -> Done
//!           |  ^
//!           v  |
//!        RetryWait
//! ```
//!
//! The machine holds no clock and performs no I/O; [`crate::ModelClient`]
//! drives it and does the actual sleeping.

use crate::config::BackoffPolicy;
use crate::{ErrorClass, LlmError};
use std::time::Duration;

/// Where a request is in its retry lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryState {
    /// Not started
    Idle,
    /// Attempt `attempt` (1-based) in flight
    Calling {
        /// Current attempt number
        attempt: u32,
    },
    /// Waiting before the next attempt
    RetryWait {
        /// Attempt that just failed
        attempt: u32,
        /// Wait before the next attempt
        delay: Duration,
    },
    /// Finished, successfully or not
    Done,
}

/// What the driver should do after a failed attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Sleep for the delay, then call [`RetryMachine::resume`]
    Retry(Duration),
    /// Stop and report the error
    GiveUp(LlmError),
}

/// Tracks attempts and decides between retrying and giving up
#[derive(Debug, Clone)]
pub struct RetryMachine<'a> {
    policy: &'a BackoffPolicy,
    max_retries: u32,
    state: RetryState,
}

impl<'a> RetryMachine<'a> {
    /// A machine allowing `max_retries` retries after the first attempt
    pub fn new(max_retries: u32, policy: &'a BackoffPolicy) -> Self {
        Self {
            policy,
            max_retries,
            state: RetryState::Idle,
        }
    }

    /// Current state
    pub fn state(&self) -> &RetryState {
        &self.state
    }

    /// Begin the first attempt; returns its number
    pub fn start(&mut self) -> u32 {
        self.state = RetryState::Calling { attempt: 1 };
        1
    }

    /// Record a successful attempt
    pub fn on_success(&mut self) {
        self.state = RetryState::Done;
    }

    /// Record a failed attempt and decide what happens next
    ///
    /// Configuration errors and permanent rejections end the request with the
    /// error unchanged. Transient errors are retried until the budget runs
    /// out, after which the last error is wrapped in
    /// [`LlmError::Unavailable`].
    pub fn on_failure(&mut self, error: LlmError) -> Transition {
        let attempt = match self.state {
            RetryState::Calling { attempt } => attempt,
            // Failure reported outside an attempt: treat as the first one
            _ => 1,
        };

        let rate_limited = match error.class() {
            ErrorClass::Fatal | ErrorClass::Permanent => {
                self.state = RetryState::Done;
                return Transition::GiveUp(error);
            }
            ErrorClass::RateLimit => true,
            ErrorClass::Transient => false,
        };

        if attempt > self.max_retries {
            self.state = RetryState::Done;
            return Transition::GiveUp(LlmError::Unavailable {
                attempts: attempt,
                last: Box::new(error),
            });
        }

        let retry_after = match &error {
            LlmError::RateLimited { retry_after } => *retry_after,
            _ => None,
        };
        let delay = self.policy.delay_for(attempt, rate_limited, retry_after);
        self.state = RetryState::RetryWait { attempt, delay };
        Transition::Retry(delay)
    }

    /// Leave the wait and begin the next attempt; returns its number
    pub fn resume(&mut self) -> u32 {
        let next = match self.state {
            RetryState::RetryWait { attempt, .. } => attempt + 1,
            RetryState::Calling { attempt } => attempt + 1,
            RetryState::Idle | RetryState::Done => 1,
        };
        self.state = RetryState::Calling { attempt: next };
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> BackoffPolicy {
        BackoffPolicy {
            initial_delay_ms: 10,
            rate_limit_initial_delay_ms: 100,
            multiplier: 2,
            max_delay_ms: 1_000,
        }
    }

    #[test]
    fn test_success_path() {
        let policy = policy();
        let mut machine = RetryMachine::new(3, &policy);
        assert_eq!(machine.state(), &RetryState::Idle);
        assert_eq!(machine.start(), 1);
        assert_eq!(machine.state(), &RetryState::Calling { attempt: 1 });
        machine.on_success();
        assert_eq!(machine.state(), &RetryState::Done);
    }

    #[test]
    fn test_transient_then_success() {
        let policy = policy();
        let mut machine = RetryMachine::new(3, &policy);
        machine.start();

        let transition = machine.on_failure(LlmError::Communication("reset".into()));
        assert_eq!(transition, Transition::Retry(Duration::from_millis(10)));
        assert_eq!(
            machine.state(),
            &RetryState::RetryWait {
                attempt: 1,
                delay: Duration::from_millis(10)
            }
        );

        assert_eq!(machine.resume(), 2);
        let transition = machine.on_failure(LlmError::Timeout(Duration::from_secs(1)));
        assert_eq!(transition, Transition::Retry(Duration::from_millis(20)));

        assert_eq!(machine.resume(), 3);
        machine.on_success();
        assert_eq!(machine.state(), &RetryState::Done);
    }

    #[test]
    fn test_exhaustion_wraps_last_error() {
        let policy = policy();
        let mut machine = RetryMachine::new(2, &policy);
        machine.start();
        assert!(matches!(
            machine.on_failure(LlmError::Communication("a".into())),
            Transition::Retry(_)
        ));
        machine.resume();
        assert!(matches!(
            machine.on_failure(LlmError::Communication("b".into())),
            Transition::Retry(_)
        ));
        machine.resume();

        match machine.on_failure(LlmError::Communication("c".into())) {
            Transition::GiveUp(LlmError::Unavailable { attempts, last }) => {
                assert_eq!(attempts, 3);
                assert_eq!(*last, LlmError::Communication("c".into()));
            }
            other => panic!("expected Unavailable, got {:?}", other),
        }
        assert_eq!(machine.state(), &RetryState::Done);
    }

    #[test]
    fn test_zero_retries_gives_up_immediately() {
        let policy = policy();
        let mut machine = RetryMachine::new(0, &policy);
        machine.start();
        assert!(matches!(
            machine.on_failure(LlmError::Timeout(Duration::from_secs(1))),
            Transition::GiveUp(LlmError::Unavailable { attempts: 1, .. })
        ));
    }

    #[test]
    fn test_configuration_error_not_retried() {
        let policy = policy();
        let mut machine = RetryMachine::new(5, &policy);
        machine.start();
        let transition = machine.on_failure(LlmError::Configuration("401".into()));
        assert_eq!(
            transition,
            Transition::GiveUp(LlmError::Configuration("401".into()))
        );
        assert_eq!(machine.state(), &RetryState::Done);
    }

    #[test]
    fn test_rejection_not_retried() {
        let policy = policy();
        let mut machine = RetryMachine::new(5, &policy);
        machine.start();
        assert!(matches!(
            machine.on_failure(LlmError::Rejected("400".into())),
            Transition::GiveUp(LlmError::Rejected(_))
        ));
    }

    #[test]
    fn test_rate_limit_uses_longer_delay() {
        let policy = policy();
        let mut machine = RetryMachine::new(3, &policy);
        machine.start();
        assert_eq!(
            machine.on_failure(LlmError::RateLimited { retry_after: None }),
            Transition::Retry(Duration::from_millis(100))
        );
        machine.resume();
        assert_eq!(
            machine.on_failure(LlmError::RateLimited {
                retry_after: Some(Duration::from_millis(700))
            }),
            Transition::Retry(Duration::from_millis(700))
        );
    }
}
