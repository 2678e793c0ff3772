use std::time::Duration;

use crate::config::Configuration;

/// Exponential backoff for the request pipeline.
///
/// The first attempt is never delayed. Retry `n` (1-based) waits
/// `initial_delay * 2^(n-1)`.
///
/// ```
/// use std::time::Duration;
/// use licensechain::client::RetryPolicy;
///
/// let policy = RetryPolicy::new(3, Duration::from_secs(1));
/// assert_eq!(policy.max_attempts(), 4);
/// assert_eq!(policy.delay_for(1), Duration::from_secs(1));
/// assert_eq!(policy.delay_for(3), Duration::from_secs(4));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retry_count: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
}

impl RetryPolicy {
    /// Upper bound on a single backoff delay.
    pub const MAX_DELAY: Duration = Duration::from_secs(300);

    pub fn new(retry_count: u32, initial_delay: Duration) -> Self {
        RetryPolicy {
            retry_count,
            initial_delay,
        }
    }

    pub fn from_config(config: &Configuration) -> Self {
        RetryPolicy::new(config.retry_count, config.retry_delay)
    }

    /// Total attempts, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }

    /// Delay before retry number `retry` (1-based). Zero for `retry == 0`.
    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let multiplier = 2u32.saturating_pow(retry - 1);
        self.initial_delay
            .checked_mul(multiplier)
            .unwrap_or(Self::MAX_DELAY)
            .min(Self::MAX_DELAY)
    }

    /// Delays for every retry, in order.
    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        (1..=self.retry_count).map(|retry| self.delay_for(retry))
    }
}
