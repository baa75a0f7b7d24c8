//! Retry policy.
//!
//! # Design Decisions
//! - `max_attempts` counts every attempt, the first one included
//! - Every failure is retryable: transport errors, bad statuses, business
//!   failures and circuit-open rejections alike
//! - Attempts are strictly sequential with jittered exponential backoff

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
            max_delay_ms,
        }
    }

    /// `None` when retries are disabled.
    pub fn from_config(config: &RetryConfig) -> Option<Self> {
        config
            .enabled
            .then(|| Self::new(config.max_attempts, config.base_delay_ms, config.max_delay_ms))
    }

    /// Delay to wait after failed attempt number `attempt` (1-based):
    /// `base * 2^(attempt-1)` capped at `max_delay_ms`, plus up to 10% jitter.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let Some(exponent) = attempt.checked_sub(1) else {
            return Duration::ZERO;
        };
        let capped = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(exponent))
            .min(self.max_delay_ms);
        let spread = capped / 10;
        let jitter = match spread {
            0 => 0,
            n => rand::thread_rng().gen_range(0..n),
        };
        Duration::from_millis(capped + jitter)
    }
}
