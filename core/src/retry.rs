//! Retry policy for C3 upstream fetches.
//!
//! Only timeout errors are retried, with a fixed (linear) delay between
//! attempts — unlike exponential-backoff retry helpers elsewhere in this
//! tree, the upstream here is a live HLS origin where a longer wait just
//! means a staler segment, so attempts are spaced evenly.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::GatewayError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay: Duration::from_secs(1),
        }
    }
}

pub enum RetryAction<T> {
    Success(T),
    Retry,
    Fail(GatewayError),
}

/// Runs `operation` up to `policy.max_retries + 1` times, sleeping
/// `policy.delay` between attempts. Stops early on cancellation or on a
/// non-retryable error.
pub async fn retry_with_backoff<F, Fut, T>(
    policy: &RetryPolicy,
    token: &CancellationToken,
    mut operation: F,
) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = RetryAction<T>>,
{
    for attempt in 0..=policy.max_retries {
        if token.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }

        match operation().await {
            RetryAction::Success(value) => return Ok(value),
            RetryAction::Fail(err) => return Err(err),
            RetryAction::Retry => {
                if attempt == policy.max_retries {
                    return Err(GatewayError::Timeout {
                        attempts: attempt + 1,
                    });
                }
                tokio::select! {
                    _ = token.cancelled() => return Err(GatewayError::Cancelled),
                    _ = tokio::time::sleep(policy.delay) => {}
                }
            }
        }
    }

    unreachable!("loop always returns on its last iteration")
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[tokio::test]
    async fn succeeds_on_first_attempt() {
        let policy = RetryPolicy {
            max_retries: 2,
            delay: Duration::from_millis(1),
        };
        let token = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let result: Result<u32, GatewayError> = retry_with_backoff(&policy, &token, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { RetryAction::Success(42) }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fails_immediately_on_non_retryable_error() {
        let policy = RetryPolicy::default();
        let token = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let result: Result<(), GatewayError> = retry_with_backoff(&policy, &token, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { RetryAction::Fail(GatewayError::upstream_status(404, "https://x/y")) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_retries_then_fails_as_timeout() {
        let policy = RetryPolicy {
            max_retries: 2,
            delay: Duration::from_millis(1),
        };
        let token = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let result: Result<(), GatewayError> = retry_with_backoff(&policy, &token, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { RetryAction::Retry }
        })
        .await;

        assert!(matches!(result, Err(GatewayError::Timeout { attempts: 3 })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn respects_cancellation_between_attempts() {
        let policy = RetryPolicy {
            max_retries: 5,
            delay: Duration::from_millis(100),
        };
        let token = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let child = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            child.cancel();
        });

        let result: Result<(), GatewayError> = retry_with_backoff(&policy, &token, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { RetryAction::Retry }
        })
        .await;

        assert!(matches!(result, Err(GatewayError::Cancelled)));
    }
}
