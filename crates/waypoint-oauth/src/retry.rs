//! Bounded retry with linear backoff.
//!
//! Every fallible provider-facing step (token exchange, profile fetch,
//! credential persistence) runs through [`with_linear_backoff`]: a fixed
//! attempt count with `base_delay × attempt` sleeps between attempts.

use std::fmt::Display;
use std::time::Duration;

use tracing::warn;

/// How a retried operation is bounded.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    /// Backoff unit: the sleep before attempt `n + 1` is `base_delay × n`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(250),
        }
    }
}

/// The terminal failure of a retried operation.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    /// How many attempts were made.
    pub attempts: u32,
    /// The error from the final attempt.
    pub last_error: E,
}

/// Run `op` up to `policy.attempts` times with linear backoff between
/// attempts.  Returns the first success, or [`RetryExhausted`] carrying
/// the final error.
pub async fn with_linear_backoff<T, E, F, Fut>(
    policy: RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, RetryExhausted<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.attempts.max(1);
    let mut last_error = None;

    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(
                    step = label,
                    attempt = attempt,
                    attempts = attempts,
                    error = %err,
                    "attempt failed"
                );
                last_error = Some(err);

                if attempt < attempts {
                    tokio::time::sleep(policy.base_delay * attempt).await;
                }
            }
        }
    }

    Err(RetryExhausted {
        attempts,
        last_error: last_error.expect("at least one attempt ran"),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
