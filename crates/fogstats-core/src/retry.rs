//! Retry engine for upstream calls.
//!
//! Runs an operation under an exponential backoff policy, consulting the
//! retryability verdict on [`UpstreamError`]. The outcome is a single tagged
//! result: the success value, or the last classified failure unchanged, so
//! callers can branch on its kind.

use std::future::Future;
use std::time::Duration;

use crate::error::UpstreamError;

/// Backoff policy for retried upstream calls.
///
/// Immutable value supplied per call site. Delay before attempt `n + 1` is
/// `min(base_delay * 2^(n-1), max_delay)`, raised to the upstream's
/// Retry-After hint when one is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempt budget, including the first call. Treated as 1 when 0.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Upper bound on any single backoff delay.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the attempt budget.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the delay cap.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Backoff delay after the given 1-based failed attempt.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        let delay = self
            .base_delay
            .checked_mul(1u32 << exp)
            .unwrap_or(self.max_delay);
        delay.min(self.max_delay)
    }

    fn attempt_budget(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Runs `operation` until it succeeds, returns a terminal error, or the
/// attempt budget is exhausted.
///
/// The inter-attempt wait suspends only the calling task; dropping the
/// returned future cancels a mid-backoff sleep along with the pending call.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, UpstreamError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, UpstreamError>>,
{
    let budget = policy.attempt_budget();
    let mut attempt = 1u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if !err.is_retryable() => {
                tracing::debug!(attempt, error = %err, "terminal upstream error, not retrying");
                return Err(err);
            }
            Err(err) => {
                if attempt >= budget {
                    tracing::warn!(
                        attempts = attempt,
                        error = %err,
                        "retry budget exhausted"
                    );
                    return Err(err);
                }

                let mut delay = policy.backoff_delay(attempt);
                if let Some(hint) = err.retry_after()
                    && hint > delay
                {
                    delay = hint;
                }

                tracing::debug!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying upstream call"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
