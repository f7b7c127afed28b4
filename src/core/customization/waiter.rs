//! Bounded fixed-interval polling.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::errors::{WaitError, WaitResult};

/// Default delay between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Default number of status checks before giving up (~150 s in total).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

type RetryPredicate = Arc<dyn Fn(&WaitError) -> bool + Send + Sync>;

/// Configuration for a bounded retry loop.
///
/// Retries stop as soon as the predicate rejects an error or after
/// `max_attempts` status checks, whichever comes first.
#[derive(Clone)]
pub struct RetrySpec {
    /// Delay between two status checks.
    pub interval: Duration,
    /// Total number of status checks, including the first. At least 1.
    pub max_attempts: u32,
    is_retryable: RetryPredicate,
}

impl Default for RetrySpec {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL, DEFAULT_MAX_ATTEMPTS)
    }
}

impl RetrySpec {
    /// Retry only timeout-class errors (see [`WaitError::is_timeout_class`]).
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
            is_retryable: Arc::new(WaitError::is_timeout_class),
        }
    }

    /// Replace the retry predicate.
    pub fn with_retryable<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&WaitError) -> bool + Send + Sync + 'static,
    {
        self.is_retryable = Arc::new(predicate);
        self
    }

    pub fn is_retryable(&self, error: &WaitError) -> bool {
        (self.is_retryable)(error)
    }

    pub fn interval_ms(&self) -> u64 {
        u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX)
    }
}

impl std::fmt::Debug for RetrySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrySpec")
            .field("interval", &self.interval)
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

/// Result of one status check.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusOutcome<T> {
    /// Not settled yet. The string says what is still pending and becomes the
    /// message of the timeout-class error.
    Pending(String),
    /// Settled successfully.
    Terminal(T),
    /// The check failed. Retried only if the retry predicate allows it.
    Failed(WaitError),
}

/// Call `status_check` every `spec.interval` until it settles.
///
/// Returns the terminal value, the first non-retryable error, or, once the
/// attempt budget is spent, the last error observed (a
/// [`WaitError::Timeout`] for a status that stayed pending).
pub async fn wait_for<T, F, Fut>(status_check: F, spec: &RetrySpec) -> WaitResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StatusOutcome<T>>,
{
    poll(status_check, spec, None).await
}

/// [`wait_for`] that gives up with [`WaitError::Cancelled`] when `cancel`
/// fires between two status checks. A check already in flight is allowed to
/// finish.
pub async fn wait_for_with_cancel<T, F, Fut>(
    status_check: F,
    spec: &RetrySpec,
    cancel: &CancellationToken,
) -> WaitResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StatusOutcome<T>>,
{
    poll(status_check, spec, Some(cancel)).await
}

async fn poll<T, F, Fut>(
    mut status_check: F,
    spec: &RetrySpec,
    cancel: Option<&CancellationToken>,
) -> WaitResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StatusOutcome<T>>,
{
    let max_attempts = spec.max_attempts.max(1);
    let interval_ms = spec.interval_ms();
    let mut attempt: u32 = 0;

    loop {
        attempt += 1;

        let error = match status_check().await {
            StatusOutcome::Terminal(value) => {
                debug!(attempt, "Status check settled");
                return Ok(value);
            }
            StatusOutcome::Pending(message) => WaitError::Timeout {
                attempts: attempt,
                interval_ms,
                message,
            },
            StatusOutcome::Failed(error) => error,
        };

        if !spec.is_retryable(&error) {
            warn!(attempt, "Status check failed: {}", error);
            return Err(error);
        }

        if attempt >= max_attempts {
            info!(
                attempts = attempt,
                interval_ms, "Giving up after exhausting the attempt budget: {}", error
            );
            return Err(error);
        }

        debug!(
            attempt,
            max_attempts, interval_ms, "Status not settled, retrying: {}", error
        );

        match cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => {
                        info!(attempts = attempt, "Status polling cancelled");
                        return Err(WaitError::Cancelled { attempts: attempt });
                    }
                    _ = sleep(spec.interval) => {}
                }
            }
            None => sleep(spec.interval).await,
        }
    }
}
