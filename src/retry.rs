//! Retry and exponential backoff around a single fallible async operation.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::error::{LLMError, NetworkErrorCode};

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default delay before the first retry; doubles on every subsequent retry.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1000);

/// Returns `true` when another attempt could plausibly succeed.
///
/// Only rate limiting (429), server-side failures (5xx) and the network codes
/// connection-reset / timed-out / name-not-resolved qualify. Anything without a
/// recognizable status or code fails fast, which includes
/// [`LLMError::Timeout`] raised by the per-attempt deadline.
pub fn is_retryable(err: &LLMError) -> bool {
    if let Some(status) = err.status() {
        return status == 429 || (500..600).contains(&status);
    }
    matches!(
        err.network_code(),
        Some(
            NetworkErrorCode::ConnectionReset
                | NetworkErrorCode::TimedOut
                | NetworkErrorCode::NameNotResolved
        )
    )
}

/// Retry budget and backoff base for the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the initial attempt; `0` disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// Delay slept after the failed attempt with the given 0-based index.
    ///
    /// # Examples
    ///
    /// ```
    /// # use std::time::Duration;
    /// # use kotoba_assist::retry::RetryPolicy;
    /// let policy = RetryPolicy::new(3, Duration::from_millis(100));
    /// assert_eq!(policy.delay_for(0), Duration::from_millis(100));
    /// assert_eq!(policy.delay_for(2), Duration::from_millis(400));
    /// ```
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Runs `operation` until it succeeds, fails fatally, or the budget runs out.
    ///
    /// `on_error` observes every failed attempt before it is classified, including
    /// attempts that are retried afterwards. Non-retryable failures are returned
    /// unchanged; exhausting the budget yields [`LLMError::RetryExhausted`] wrapping
    /// the last failure.
    pub async fn run<T, F, Fut, E>(
        &self,
        provider: &'static str,
        mut on_error: E,
        mut operation: F,
    ) -> Result<T, LLMError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LLMError>>,
        E: FnMut(&LLMError),
    {
        let mut attempt = 0u32;
        loop {
            debug!(provider, attempt, "dispatching attempt");
            let err = match operation().await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            on_error(&err);

            if !is_retryable(&err) {
                debug!(provider, attempt, error = %err, "failure is not retryable");
                return Err(err);
            }

            if attempt >= self.max_retries {
                error!(
                    provider,
                    retries = self.max_retries,
                    error = %err,
                    "retries exhausted"
                );
                return Err(LLMError::RetryExhausted {
                    provider,
                    retries: self.max_retries,
                    source: Box::new(err),
                });
            }

            let delay = self.delay_for(attempt);
            warn!(
                provider,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "retryable failure, backing off"
            );
            sleep(delay).await;
            attempt += 1;
        }
    }
}

/// Extracts the numeric `Retry-After` header (seconds) if present.
///
/// The value is carried on [`LLMError::RateLimit`] for callers; the backoff schedule
/// itself stays exponential.
pub(crate) fn retry_after_from_headers(headers: &HashMap<String, String>) -> Option<Duration> {
    headers
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("retry-after"))
        .and_then(|(_, value)| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
