//! Retry policy.

use std::time::Duration;

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, first call included. Values below 1 behave like 1.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles for every further attempt.
    pub base_delay: Duration,
    /// Optional cap applied to every delay.
    pub max_delay: Option<Duration>,
    /// Jitter factor (0.0-1.0). Zero keeps the schedule exact.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: None,
            jitter: 0.0,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Create a policy with exponential backoff.
    pub fn exponential(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
            ..Default::default()
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Delay to wait after failed attempt `attempt` (1-indexed): `base * 2^(attempt-1)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
        let mut delay = self.base_delay.saturating_mul(factor);
        if let Some(max) = self.max_delay {
            delay = delay.min(max);
        }

        if self.jitter <= 0.0 {
            return delay;
        }

        // Deterministic pseudo-jitter derived from the attempt number.
        let delay_ms = delay.as_millis() as f64;
        let pseudo_random = ((attempt as f64 * 17.0) % 100.0) / 100.0;
        let jitter = delay_ms * self.jitter * (pseudo_random - 0.5) * 2.0;
        Duration::from_millis((delay_ms + jitter).max(0.0) as u64)
    }

    /// Check if another attempt is allowed after `attempt` attempts were made.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts.max(1)
    }
}
