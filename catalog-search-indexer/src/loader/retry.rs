//! Bounded exponential backoff for apply attempts.

use std::time::Duration;

use tokio_retry::strategy::{jitter, ExponentialBackoff};

/// Default number of attempts per event.
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default delay before the second attempt.
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 200;

/// Upper bound for a single delay.
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// How often and how patiently a failed apply is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. At least 1.
    pub max_attempts: u32,
    /// Delay after the first failure; doubled after each further failure.
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }

    /// Delays between attempts: `max_attempts - 1` jittered, doubling delays
    /// starting around `initial_backoff` and capped at 10 s.
    pub fn strategy(&self) -> impl Iterator<Item = Duration> {
        // ExponentialBackoff yields factor * 2^n for n = 1, 2, ...
        let initial_ms = u64::try_from(self.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        ExponentialBackoff::from_millis(2)
            .factor(initial_ms.div_ceil(2).max(1))
            .max_delay(MAX_BACKOFF)
            .map(jitter)
            .take(self.max_attempts.saturating_sub(1) as usize)
    }
}
