//! Caller-side retry helpers.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::{ApiError, Method};

/// Bounded retry with linearly increasing backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first; never below 1.
    pub max_attempts: u32,
    /// Delay after the first failure; the n-th failure waits `n × base_delay`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
            base_delay,
        }
    }

    /// Wait after failed attempt number `attempt` (1-based).
    #[must_use]
    pub const fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Run `op` under `policy`.
///
/// Retries only failures that are retryable (network, 5xx, 429) and only for
/// idempotent `method`s. `POST` and `PATCH` run exactly once. A `Retry-After`
/// on the failure stretches the wait to at least that long.
///
/// # Errors
///
/// Returns the last error once attempts run out or a failure is final.
pub async fn retry_request<T, F, Fut>(
    policy: RetryPolicy,
    method: Method,
    mut op: F,
) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    let attempts = if method.is_idempotent() {
        policy.max_attempts
    } else {
        1
    };

    let mut attempt = 1;
    loop {
        match op().await {
            Err(e) if attempt < attempts && e.is_retryable() => {
                let backoff = policy.delay_for(attempt);
                let delay = e
                    .retry_after
                    .map_or(backoff, |secs| backoff.max(Duration::from_secs(secs)));
                warn!(
                    attempt,
                    max_attempts = attempts,
                    status = e.status_code,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Request failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

/// Run `op`, and run it once more if it failed with a 401 that led to a
/// successful credential refresh.
///
/// Safe for every verb: the first attempt was rejected before any side effect.
///
/// # Errors
///
/// Returns the error of the last attempt.
pub async fn reauth_once<T, F, Fut>(mut op: F) -> Result<T, ApiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ApiError>>,
{
    match op().await {
        Err(e) if e.credentials_refreshed => {
            debug!("Reissuing request with refreshed credentials");
            op().await
        }
        result => result,
    }
}
