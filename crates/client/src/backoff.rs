// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Exponential backoff delay computation.
//!
//! Delays are deterministic: no jitter is applied.

use std::time::Duration;

/// Parameters of an exponential backoff sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Upper clamp on any computed delay.
    pub max_delay: Duration,
    /// Growth factor per retry.
    pub multiplier: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy {
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            multiplier: 2.0,
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry number `attempt` (1-based).
    ///
    /// `min(initial_delay * multiplier^(attempt - 1), max_delay)`. Options
    /// are not validated; a non-positive multiplier yields zero delays.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        let initial_ms = self.initial_delay.as_millis() as f64;
        let max_ms = self.max_delay.as_millis() as f64;
        let computed = initial_ms * self.multiplier.powi(exponent);
        // `f64::min` ignores NaN; the cast saturates at the u64 bounds.
        Duration::from_millis(computed.min(max_ms) as u64)
    }

    /// Delays for retries `1..max_attempts`, in order.
    ///
    /// A run with `max_attempts` total attempts sleeps at most
    /// `max_attempts - 1` times.
    pub fn delays(&self, max_attempts: u32) -> impl Iterator<Item = Duration> + '_ {
        (1..max_attempts).map(move |attempt| self.delay_for(attempt))
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
