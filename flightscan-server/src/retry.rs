//! Retry combinator with exponential backoff.
//!
//! The caller supplies the operation and a predicate that separates
//! transient failures (retry after backoff) from definitive ones (return
//! immediately).

use std::future::Future;
use std::time::Duration;

/// Outcome of a failed [`RetryPolicy::run`].
#[derive(Debug, PartialEq)]
pub enum RetryError<E> {
    /// Every attempt failed with a retryable error; `last` is the final one.
    Exhausted { attempts: u32, last: E },
    /// A non-retryable error ended the loop early.
    Fatal(E),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }

    /// Delay after failed attempt `n` (0-based): initial · 2ⁿ.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }

    /// Run `op` until it succeeds, fails definitively, or the attempt budget
    /// is spent. `op` receives the 0-based attempt number. No delay follows
    /// the final attempt.
    pub async fn run<T, E, F, Fut, P>(&self, mut op: F, is_retryable: P) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            let err = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !is_retryable(&err) {
                return Err(RetryError::Fatal(err));
            }

            let made = attempt + 1;
            if made >= self.max_attempts {
                tracing::warn!(attempts = made, error = %err, "Retry budget exhausted");
                return Err(RetryError::Exhausted {
                    attempts: made,
                    last: err,
                });
            }

            let delay = self.backoff(attempt);
            tracing::debug!(
                attempt = made,
                max_attempts = self.max_attempts,
                backoff_ms = delay.as_millis() as u64,
                error = %err,
                "Attempt failed, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
