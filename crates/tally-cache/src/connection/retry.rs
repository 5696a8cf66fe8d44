//! Reconnect backoff policy and budget.

use std::time::Duration;

/// Maps failed connection attempts to backoff delays.
///
/// Delay for attempt `n` is `min(n * step, max_delay)`. Once more than
/// `max_attempts` attempts have failed, no further delay is produced and the
/// store is given up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Linear backoff step.
    pub step: Duration,
    /// Upper bound on a single delay.
    pub max_delay: Duration,
    /// Failed attempts tolerated before giving up.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            step: Duration::from_millis(1000),
            max_delay: Duration::from_millis(3000),
            max_attempts: 3,
        }
    }
}

impl RetryPolicy {
    /// Returns the delay before retrying after `attempt` failures, or `None`
    /// when the budget is exhausted.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }
        Some(self.step.saturating_mul(attempt).min(self.max_delay))
    }
}

/// Consecutive failed connection attempts, checked against a [`RetryPolicy`].
#[derive(Debug, Clone)]
pub struct RetryBudget {
    policy: RetryPolicy,
    attempts: u32,
}

impl RetryBudget {
    /// Creates an unused budget.
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    /// Records a failed attempt and returns the delay before the next one,
    /// or `None` if no attempts remain.
    pub fn record_failure(&mut self) -> Option<Duration> {
        self.attempts = self.attempts.saturating_add(1);
        self.policy.delay_for(self.attempts)
    }

    /// Resets the counter after a successful connection.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Returns the number of consecutive failed attempts.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns true once more than `max_attempts` attempts have failed.
    pub fn is_exhausted(&self) -> bool {
        self.attempts > self.policy.max_attempts
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}
