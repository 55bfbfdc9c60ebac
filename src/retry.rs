//! Retry executor shared by every service-facing call.
//!
//! The classifier decides *whether* a failure may be retried
//! ([`ConvertError::is_retryable`]); this module decides *when*. Delays
//! grow exponentially from a configurable base with uniform jitter added
//! on top, so a burst of callers hitting a rate limit does not re-arrive
//! in lockstep. Each call site gets its own attempt budget: an upload that
//! burned its retries does not eat into the poll loop's budget.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, warn};

use crate::error::ConvertError;

/// Attempt budget and delay shape for one class of request.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, first try included. Never less than 1.
    pub attempts: u32,
    /// Backoff unit; also the jitter range added to every delay.
    pub base_delay: Duration,
    /// Hard ceiling on a single delay.
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Delay to sleep after `failed_attempt` (1-based) before the next try:
    /// `min(base · 2^(failed_attempt-1) + jitter(0..=base), max_delay)`.
    fn delay_after(&self, failed_attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        // Exponent capped well below overflow; max_delay clamps anyway.
        let exp = failed_attempt.saturating_sub(1).min(10);
        let backoff = base_ms.saturating_mul(1u64 << exp);
        let jitter = rand::rng().random_range(0..=base_ms);
        let capped = backoff
            .saturating_add(jitter)
            .min(self.max_delay.as_millis() as u64);
        Duration::from_millis(capped)
    }
}

/// Run `op` until it succeeds, fails non-retryably, or the budget runs out.
///
/// `op` is re-invoked from scratch on every attempt, so request bodies must
/// be rebuildable (the call sites clone buffers or rebuild multipart forms).
/// Non-retryable errors surface immediately, with no delay spent on them.
pub async fn with_retries<F, Fut, T>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, ConvertError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ConvertError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(label, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if err.is_retryable() && attempt < policy.attempts => {
                let delay = policy.delay_after(attempt);
                warn!(
                    label,
                    attempt,
                    max_attempts = policy.attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                if err.is_retryable() {
                    warn!(
                        label,
                        attempts = attempt,
                        error = %err,
                        "retry budget exhausted"
                    );
                }
                return Err(err);
            }
        }
    }
}
