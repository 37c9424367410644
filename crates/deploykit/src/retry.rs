//! Retry logic with exponential backoff and per-attempt timeouts.

use crate::error::{Error, Result};
use crate::types::RetryConfig;
use std::thread;
use std::time::Instant;

/// Callback trait for retry progress notifications.
pub trait RetryCallback {
    /// Called when an operation is being retried.
    ///
    /// # Arguments
    /// * `attempt` - Attempt that just failed (1-indexed)
    /// * `max_attempts` - Maximum number of attempts
    /// * `error` - The error that triggered the retry
    /// * `delay_ms` - Milliseconds until next attempt
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay_ms: u128);
}

/// No-op callback that does nothing.
pub struct NoCallback;

impl RetryCallback for NoCallback {
    fn on_retry(&self, _attempt: u32, _max_attempts: u32, _error: &Error, _delay_ms: u128) {}
}

/// Callback that reports retries through the `log` facade.
pub struct LogCallback;

impl RetryCallback for LogCallback {
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay_ms: u128) {
        log::warn!(
            "Attempt {}/{} failed: {}. Retrying in {}ms...",
            attempt,
            max_attempts,
            error,
            delay_ms
        );
    }
}

/// Execute an operation with retry logic.
///
/// Non-retryable errors are returned after the first attempt. Retryable
/// errors are retried until `config.max_attempts()` attempts have run, then
/// the last error is returned.
pub fn with_retry<T, F>(
    config: &RetryConfig,
    callback: Option<&dyn RetryCallback>,
    operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    with_retry_classified(config, Error::is_retryable, callback, operation)
}

/// Execute an operation with retry logic and a custom retry classifier.
///
/// An attempt that succeeds but takes longer than
/// `config.attempt_timeout` is discarded and counts as a
/// [`Error::Timeout`], which `classify` decides on like any other error.
///
/// Attempts run on the calling thread and are not interrupted: the timeout
/// is checked once the attempt returns, so a slow attempt runs to
/// completion before its result is thrown away.
pub fn with_retry_classified<T, F, C>(
    config: &RetryConfig,
    classify: C,
    callback: Option<&dyn RetryCallback>,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
    C: Fn(&Error) -> bool,
{
    let max_attempts = config.max_attempts();
    let mut attempt = 0;

    loop {
        let started = Instant::now();
        let outcome = operation();
        let elapsed = started.elapsed();

        let error = match outcome {
            Ok(_) if elapsed > config.attempt_timeout => Error::Timeout {
                elapsed,
                limit: config.attempt_timeout,
            },
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        // If error is not retryable, return immediately
        if !classify(&error) {
            return Err(error);
        }

        // If this was the last attempt, return the error
        if attempt + 1 >= max_attempts {
            return Err(error);
        }

        let delay = config.delay_for_attempt(attempt);
        if let Some(cb) = callback {
            cb.on_retry(attempt + 1, max_attempts, &error, delay.as_millis());
        }

        thread::sleep(delay);
        attempt += 1;
    }
}
