//! Retry pacing for Telegram calls
//!
//! Transient failures back off exponentially within a fixed budget.
//! Flood waits are dictated by the server and do not touch that budget.

use crate::config::StreamConfig;
use std::time::Duration;

/// Upper bound for a single backoff delay
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Exponential backoff with a retry budget
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base_delay: Duration,
    max_attempts: u32,
    current_attempt: u32,
}

impl ExponentialBackoff {
    /// Create a backoff starting at `base_delay_ms`, allowing `max_attempts` retries
    pub fn new(base_delay_ms: u64, max_attempts: u32) -> Self {
        ExponentialBackoff {
            base_delay: Duration::from_millis(base_delay_ms),
            max_attempts,
            current_attempt: 0,
        }
    }

    /// Backoff for chunk fetches as configured
    pub fn for_fetch(config: &StreamConfig) -> Self {
        Self::new(config.retry_base_delay_ms, config.retry_attempts)
    }

    /// Delay before the next retry, or None once the budget is spent
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.current_attempt >= self.max_attempts {
            return None;
        }

        let delay = self.base_delay * 2u32.saturating_pow(self.current_attempt);
        self.current_attempt += 1;

        Some(delay.min(MAX_BACKOFF))
    }

    /// Retries consumed so far
    pub fn attempts(&self) -> u32 {
        self.current_attempt
    }
}

/// How long to sleep for a FLOOD_WAIT of `wait_secs`
pub fn flood_wait(wait_secs: u64) -> Duration {
    Duration::from_secs(wait_secs)
}
