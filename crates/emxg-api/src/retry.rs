// Retry policy for single page requests
//
// Exponential backoff clamped into `[min_delay, max_delay]`, with a fixed
// attempt cap and a predicate deciding which errors are worth another try.

use std::time::Duration;

use crate::error::Error;

/// Decides whether an error may be retried.
pub type RetryPredicate = fn(&Error) -> bool;

/// Backoff schedule plus attempt cap around one request.
///
/// The wait before attempt `n + 1` is `multiplier * 2^(n - 1)`, clamped into
/// `[min_delay, max_delay]`. With the defaults (1 s multiplier, 4 s..10 s
/// clamp, 5 attempts) the waits are 4 s, 4 s, 4 s, 8 s.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub multiplier: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
    predicate: RetryPredicate,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            multiplier: Duration::from_secs(1),
            min_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(10),
            predicate: Error::is_retryable,
        }
    }
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        multiplier: Duration,
        min_delay: Duration,
        max_delay: Duration,
    ) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            multiplier,
            min_delay,
            max_delay: max_delay.max(min_delay),
            predicate: Error::is_retryable,
        }
    }

    /// A policy that makes exactly one attempt.
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO, Duration::ZERO)
    }

    /// Replace the retryability predicate.
    #[must_use]
    pub fn with_predicate(mut self, predicate: RetryPredicate) -> Self {
        self.predicate = predicate;
        self
    }

    /// Wait after the `attempt`-th failure (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        let raw = self.multiplier.saturating_mul(2u32.saturating_pow(exponent));
        raw.clamp(self.min_delay, self.max_delay)
    }

    /// Delay before the next attempt, or `None` if `err` after `attempt`
    /// tries should be returned to the caller.
    pub fn next_delay(&self, attempt: u32, err: &Error) -> Option<Duration> {
        if attempt >= self.max_attempts || !(self.predicate)(err) {
            return None;
        }
        Some(self.delay_for(attempt))
    }
}
