//! Per-URL retry state machine with exponential back-off.
//!
//! ```text
//! Pending -> Attempting -> Done
//!                       -> Retrying -> Attempting
//!                       -> Exhausted
//! ```

use std::time::Duration;

use crate::error::ScraperError;

/// Lifecycle of one target URL inside a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlState {
    Pending,
    /// Running attempt number `attempt` (1-based).
    Attempting { attempt: u32 },
    /// Attempt `failed_attempt` failed; sleeping `delay` before the next one.
    Retrying { failed_attempt: u32, delay: Duration },
    Done { attempts: u32 },
    Exhausted { attempts: u32 },
}

impl UrlState {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, UrlState::Done { .. } | UrlState::Exhausted { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per URL, including the first.
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(2_000),
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_scrape_settings(settings: &adlib_core::ScrapeSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            base_delay: Duration::from_millis(settings.retry_base_delay_ms),
        }
    }

    /// Back-off after failed attempt `attempt` (1-based): `base * 2^(attempt - 1)`.
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Next state after attempt `attempt` failed with `err`.
    #[must_use]
    pub fn on_failure(&self, attempt: u32, err: &ScraperError) -> UrlState {
        if !err.is_retriable() || attempt >= self.max_attempts {
            UrlState::Exhausted { attempts: attempt }
        } else {
            UrlState::Retrying {
                failed_attempt: attempt,
                delay: self.delay_after(attempt),
            }
        }
    }
}
