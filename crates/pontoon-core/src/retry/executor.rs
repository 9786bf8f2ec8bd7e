//! Retry execution

use std::future::Future;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::RetryPolicy;

use super::strategies::calculate_delay;

/// Execute an async operation, retrying transient failures per the policy.
///
/// Errors for which [`Error::is_transient`] is false abort immediately;
/// transient errors are retried up to `policy.max_attempts` total
/// attempts with backoff and jitter. The last error is returned when
/// attempts are exhausted.
pub async fn retry_with_policy<F, Fut, T>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);

    for attempt in 1..=max_attempts {
        match op().await {
            Ok(result) => return Ok(result),
            Err(err) if !err.is_transient() => return Err(err),
            Err(err) if attempt >= max_attempts => {
                warn!(
                    "{label}: attempt {attempt}/{max_attempts} failed, giving up: {err}"
                );
                return Err(err);
            }
            Err(err) => {
                let delay = calculate_delay(policy, attempt, true);
                debug!(
                    "{label}: attempt {attempt}/{max_attempts} failed ({err}), retrying in {delay:?}"
                );
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    unreachable!("retry loop always returns within max_attempts")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RetryStrategy;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn test_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            strategy: RetryStrategy::FixedDelay,
            backoff_multiplier: 2.0,
            initial_delay_ms: 5,
            max_delay_ms: 20,
        }
    }

    #[tokio::test]
    async fn test_immediate_success() {
        let result = retry_with_policy(&test_policy(), "op", || async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_success_after_transient_failures() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result = retry_with_policy(&test_policy(), "op", || {
            let attempts = attempts_clone.clone();
            async move {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::upload("chunks/x/0", "timeout"))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result: Result<()> = retry_with_policy(&test_policy(), "op", || {
            let attempts = attempts_clone.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(Error::download("chunks/x/1", "connection reset"))
            }
        })
        .await;

        assert!(matches!(result.unwrap_err(), Error::Download { .. }));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_error_short_circuits() {
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let result: Result<()> = retry_with_policy(&test_policy(), "op", || {
            let attempts = attempts_clone.clone();
            async move {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(Error::connection("s3://bucket", "access denied"))
            }
        })
        .await;

        assert!(matches!(result.unwrap_err(), Error::Connection { .. }));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
