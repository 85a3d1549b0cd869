//! Bounded retry with linear backoff for transient errors.

use crate::error::{Error, Result};
use crate::types::RetryConfig;
use std::thread;
use std::time::{Duration, Instant};

/// Callback trait for retry progress notifications.
pub trait RetryCallback {
    /// Called before sleeping ahead of another attempt.
    ///
    /// # Arguments
    /// * `attempt` - Attempt that just failed (1-indexed)
    /// * `max_attempts` - Maximum number of attempts
    /// * `error` - The error that triggered the retry
    /// * `delay` - Time until the next attempt
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay: Duration);
}

/// No-op callback that does nothing.
pub struct NoCallback;

impl RetryCallback for NoCallback {
    fn on_retry(&self, _attempt: u32, _max_attempts: u32, _error: &Error, _delay: Duration) {}
}

/// Callback that reports retries through the `log` facade.
pub struct LogCallback;

impl RetryCallback for LogCallback {
    fn on_retry(&self, attempt: u32, max_attempts: u32, error: &Error, delay: Duration) {
        log::warn!(
            "Attempt {attempt}/{max_attempts} failed: {error}. Retrying in {}ms",
            delay.as_millis()
        );
    }
}

/// Execute an operation with retry logic.
///
/// Retries the operation while it returns a retryable error, up to
/// `config.max_attempts` attempts in total. Non-retryable errors are
/// returned immediately.
pub fn with_retry<T, F>(
    config: &RetryConfig,
    callback: Option<&dyn RetryCallback>,
    operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    with_retry_until(config, None, callback, operation)
}

/// Like [`with_retry`], but never sleeps past `deadline`.
///
/// When a transient failure happens with no time left, that failure is
/// returned instead of waiting for another attempt.
pub fn with_retry_until<T, F>(
    config: &RetryConfig,
    deadline: Option<Instant>,
    callback: Option<&dyn RetryCallback>,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Result<T>,
{
    let max_attempts = config.max_attempts.max(1);

    for attempt in 0..max_attempts {
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !e.is_retryable() || attempt + 1 >= max_attempts {
                    return Err(e);
                }

                let mut delay = config.delay_for_attempt(attempt);
                if let Some(deadline) = deadline {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Err(e);
                    }
                    delay = delay.min(remaining);
                }

                if let Some(cb) = callback {
                    cb.on_retry(attempt + 1, max_attempts, &e, delay);
                }

                thread::sleep(delay);
            }
        }
    }

    Err(Error::Other("retry exhausted".to_string()))
}
