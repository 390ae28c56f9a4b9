// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Retry execution with exponential backoff.
//!
//! [`RetryExecutor::run`] invokes an operation until it succeeds, fails
//! with a non-retryable error, or runs out of attempts. Attempts are
//! strictly sequential and the only suspension point is the backoff sleep.

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::backoff::BackoffPolicy;

/// Status codes retried by default.
pub const DEFAULT_RETRYABLE_STATUS_CODES: [u16; 6] = [408, 429, 500, 502, 503, 504];

/// Classification of a failure for retry purposes.
///
/// A failure is either a transport error (no response reached us) or a
/// response carrying a status code. These are the only two shapes the
/// executor inspects.
pub trait Retryable: std::error::Error + Send + Sync {
    /// No response was received (connection refused, DNS failure, timeout).
    fn is_transport(&self) -> bool;

    /// Status code of the response, if one was received.
    fn status_code(&self) -> Option<u16>;
}

/// Observer invoked before each retry sleep with the 1-based retry number
/// and the error that triggered it.
pub type RetryObserver = Arc<dyn Fn(u32, &dyn Retryable) + Send + Sync>;

/// Retry configuration.
#[derive(Clone)]
pub struct RetryOptions {
    /// Total attempts including the first.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub retryable_status_codes: HashSet<u16>,
    pub on_retry: Option<RetryObserver>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        RetryOptions {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            backoff_multiplier: 2.0,
            retryable_status_codes: DEFAULT_RETRYABLE_STATUS_CODES.into_iter().collect(),
            on_retry: None,
        }
    }
}

impl fmt::Debug for RetryOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut codes: Vec<_> = self.retryable_status_codes.iter().collect();
        codes.sort();
        f.debug_struct("RetryOptions")
            .field("max_attempts", &self.max_attempts)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("retryable_status_codes", &codes)
            .field("on_retry", &self.on_retry.as_ref().map(|_| "<observer>"))
            .finish()
    }
}

impl RetryOptions {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    pub fn with_retryable_status_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.retryable_status_codes = codes.into_iter().collect();
        self
    }

    /// Sets the observer called before each retry sleep.
    pub fn on_retry<F>(mut self, observer: F) -> Self
    where
        F: Fn(u32, &dyn Retryable) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(observer));
        self
    }

    /// The backoff parameters of these options.
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy {
            initial_delay: self.initial_delay,
            max_delay: self.max_delay,
            multiplier: self.backoff_multiplier,
        }
    }

    /// Whether `error` may be retried under these options.
    pub fn is_retryable(&self, error: &dyn Retryable) -> bool {
        error.is_transport()
            || error
                .status_code()
                .is_some_and(|code| self.retryable_status_codes.contains(&code))
    }
}

/// Runs fallible operations under a [`RetryOptions`] policy.
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    options: RetryOptions,
}

impl RetryExecutor {
    pub fn new(options: RetryOptions) -> Self {
        RetryExecutor { options }
    }

    pub fn options(&self) -> &RetryOptions {
        &self.options
    }

    /// Runs `operation` with this executor's options.
    pub async fn run<T, E, F, Fut>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable,
    {
        run_with_retry(&self.options, operation).await
    }
}

/// Runs `operation` until it succeeds or the policy says stop.
///
/// Returns the success value, or the most recent error when the error is
/// not retryable or `options.max_attempts` attempts have been made. With
/// `max_attempts <= 1` the first failure is final.
pub async fn run_with_retry<T, E, F, Fut>(options: &RetryOptions, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable,
{
    let backoff = options.backoff();
    let mut attempt: u32 = 1;

    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !options.is_retryable(&error) {
            tracing::debug!(attempt, error = %error, "non-retryable failure");
            return Err(error);
        }

        if attempt >= options.max_attempts {
            tracing::warn!(attempts = attempt, error = %error, "retries exhausted");
            return Err(error);
        }

        if let Some(observer) = &options.on_retry {
            observer(attempt, &error);
        }

        let delay = backoff.delay_for(attempt);
        tracing::debug!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "retrying after backoff"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
#[path = "retry_tests.rs"]
mod tests;
