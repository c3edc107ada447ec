//! Retry policy and the per-fetch attempt state machine
//!
//! A fetch moves through
//! `Attempting(n) -> Succeeded | Rejected | Retryable(n + 1) -> ... -> Exhausted`.
//! The machine is pure: the fetcher feeds it one attempt outcome at a time
//! and sleeps for the delay it hands back.

use crate::config::RetryConfig;
use crate::crawler::fetcher::FailureKind;
use std::time::Duration;

/// Exponential backoff settings for transient failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
    /// Cap for any single delay
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }

    /// Delay before retry number `retry` (1-based): base * 2^(retry - 1), capped
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.base_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Outcome of a single HTTP attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome<T> {
    Success(T),
    Failed(FailureKind),
}

/// State of one fetch across its attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptState<T> {
    /// Attempt number `n` (1-based) is about to run
    Attempting(u32),

    /// A transient failure; wait `delay`, then run `next_attempt`
    Retryable {
        next_attempt: u32,
        delay: Duration,
        last_failure: FailureKind,
    },

    /// The attempt succeeded
    Succeeded { value: T, attempts: u32 },

    /// A permanent failure; never retried
    Rejected { kind: FailureKind, attempts: u32 },

    /// Transient failures used up every retry
    Exhausted { kind: FailureKind, attempts: u32 },
}

impl<T> AttemptState<T> {
    pub fn start() -> Self {
        Self::Attempting(1)
    }

    /// Feeds the outcome of the attempt in progress
    ///
    /// Only meaningful in `Attempting`; any other state is returned as is.
    pub fn on_outcome(self, outcome: AttemptOutcome<T>, policy: &RetryPolicy) -> Self {
        let Self::Attempting(attempt) = self else {
            return self;
        };

        match outcome {
            AttemptOutcome::Success(value) => Self::Succeeded {
                value,
                attempts: attempt,
            },
            AttemptOutcome::Failed(kind) if !kind.is_transient() => Self::Rejected {
                kind,
                attempts: attempt,
            },
            AttemptOutcome::Failed(kind) if attempt <= policy.max_retries => Self::Retryable {
                next_attempt: attempt + 1,
                delay: policy.delay_for(attempt),
                last_failure: kind,
            },
            AttemptOutcome::Failed(kind) => Self::Exhausted {
                kind,
                attempts: attempt,
            },
        }
    }

    /// Leaves `Retryable` once its delay has elapsed
    pub fn resume(self) -> Self {
        match self {
            Self::Retryable { next_attempt, .. } => Self::Attempting(next_attempt),
            other => other,
        }
    }

    /// True for `Succeeded`, `Rejected` and `Exhausted`
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Self::Succeeded { .. } | Self::Rejected { .. } | Self::Exhausted { .. }
        )
    }
}
