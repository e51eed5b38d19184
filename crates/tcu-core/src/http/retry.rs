//! Retry logic with exponential backoff for transport attempts
//!
//! Delays start at 100ms and double per retry (100ms, 200ms, 400ms, ...),
//! capped at `max_delay`. A delay is only taken between attempts, never after
//! the last one.

use backoff::{backoff::Backoff, ExponentialBackoff};
use std::time::Duration;

use crate::http::error::TransportFailure;

/// Default delay before the first retry
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(100);

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, the first one included
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy with custom attempt count
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }

    /// Set the initial delay
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Create a deterministic exponential backoff instance
    pub fn create_backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.initial_delay,
            initial_interval: self.initial_delay,
            randomization_factor: 0.0,
            multiplier: self.multiplier,
            max_interval: self.max_delay,
            max_elapsed_time: None, // attempts are bounded separately
            ..Default::default()
        }
    }
}

/// Decision on whether to retry a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay
    Retry { delay: Duration },
    /// Do not retry
    NoRetry,
}

/// Tracks attempts and backoff state for one logical call
#[derive(Debug)]
pub struct RetryHandler {
    policy: RetryPolicy,
    attempts: u32,
    backoff: ExponentialBackoff,
}

impl RetryHandler {
    /// Create a new retry handler with the given policy
    pub fn new(policy: RetryPolicy) -> Self {
        let backoff = policy.create_backoff();
        Self {
            policy,
            attempts: 0,
            backoff,
        }
    }

    /// Record that an attempt is about to start
    pub fn begin_attempt(&mut self) -> u32 {
        self.attempts += 1;
        self.attempts
    }

    /// Decide whether the attempt that just failed should be retried
    pub fn should_retry(&mut self, failure: &TransportFailure) -> RetryDecision {
        if !failure.should_retry() || self.attempts >= self.policy.max_attempts {
            return RetryDecision::NoRetry;
        }

        let delay = self.backoff.next_backoff().unwrap_or(self.policy.max_delay);
        RetryDecision::Retry { delay }
    }

    /// Get the number of attempts started so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
