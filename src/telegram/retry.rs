//! Transport retry with exponential backoff.
//!
//! By default only transient failures are retried (network errors and rate
//! limiting). Calls that must not run twice narrow that to rate limiting.
//! A rate-limit response carries the server's `retry_after`, which replaces
//! the computed backoff for that attempt.

use super::traits::{TransportError, TransportResult};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Maximum backoff between two attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// How many times, and how patiently, to retry a transport call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubled for every further attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
        }
    }

    /// Backoff after the given zero-based failed attempt.
    ///
    /// `base_delay * 2^attempt`, capped at [`MAX_BACKOFF`].
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(MAX_BACKOFF)
    }

    /// Wait before retrying after `err`; a server-supplied `retry_after` wins.
    pub fn delay_for(&self, attempt: u32, err: &TransportError) -> Duration {
        match err.retry_after() {
            Some(secs) => Duration::from_secs(secs).min(MAX_BACKOFF),
            None => self.backoff(attempt),
        }
    }
}

/// Run `operation` until it succeeds, fails with an error `retryable`
/// rejects, or the policy's attempts are used up. Returns the last error in
/// the latter cases.
///
/// Idempotent calls pass [`TransportError::is_retryable`]; calls that must
/// not run twice pass [`TransportError::is_safe_to_repeat`].
pub async fn retry_with_backoff_if<R, F, Fut, T>(
    policy: &RetryPolicy,
    retryable: R,
    mut operation: F,
) -> TransportResult<T>
where
    R: Fn(&TransportError) -> bool,
    F: FnMut() -> Fut,
    Fut: Future<Output = TransportResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(err) => {
                if !retryable(&err) || attempt + 1 >= max_attempts {
                    return Err(err);
                }

                let delay = policy.delay_for(attempt, &err);
                warn!(
                    attempt = attempt + 1,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transport call failed, retrying"
                );

                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
