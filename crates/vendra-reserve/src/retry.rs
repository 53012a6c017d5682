//! # Retry Loop
//!
//! Bounded exponential backoff around the ledger primitives.
//!
//! Only transient infrastructure errors are retried. A business outcome
//! (shortfall, missing item) propagates on the first attempt: retrying it
//! would just re-ask a question whose answer hasn't changed.

use std::future::Future;

use tracing::warn;

use crate::config::RetryPolicy;
use crate::error::ReserveError;
use vendra_db::LedgerError;

/// Runs `operation` until it succeeds, fails with a non-retryable error,
/// or exhausts the policy's attempts.
pub(crate) async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    name: &str,
    mut operation: F,
) -> Result<T, ReserveError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    let mut attempt: u32 = 0;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),

            Err(err) if err.is_retryable() => {
                attempt += 1;

                if attempt >= policy.max_attempts {
                    let LedgerError::Db(source) = err else {
                        // is_retryable only matches Db errors.
                        unreachable!("retryable ledger error must be a DbError");
                    };
                    return Err(ReserveError::RetriesExhausted {
                        attempts: attempt,
                        source,
                    });
                }

                let delay = policy.backoff_for(attempt - 1);
                warn!(
                    operation = %name,
                    attempt = %attempt,
                    delay_ms = %delay.as_millis(),
                    error = %err,
                    "Transient storage conflict, backing off"
                );
                tokio::time::sleep(delay).await;
            }

            Err(err) => return Err(err.into()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use vendra_core::CoreError;
    use vendra_db::DbError;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff_ms: 1,
            max_backoff_ms: 2,
        }
    }

    #[tokio::test]
    async fn test_retries_transient_conflicts_then_succeeds() {
        let calls = AtomicU32::new(0);

        let result = with_retry(&fast_policy(), "test", || {
            let calls = &calls;
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(LedgerError::Db(DbError::Busy("database is locked".into())))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let calls = AtomicU32::new(0);

        let result: Result<(), ReserveError> = with_retry(&fast_policy(), "test", || {
            let calls = &calls;
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(LedgerError::Db(DbError::Busy("database is locked".into())))
            }
        })
        .await;

        match result.unwrap_err() {
            ReserveError::RetriesExhausted { attempts, .. } => assert_eq!(attempts, 3),
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_business_errors_are_not_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<(), ReserveError> = with_retry(&fast_policy(), "test", || {
            let calls = &calls;
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(LedgerError::Domain(CoreError::InsufficientStock {
                    item: "p1".into(),
                    available: 1,
                    requested: 2,
                }))
            }
        })
        .await;

        assert!(matches!(
            result.unwrap_err(),
            ReserveError::Domain(CoreError::InsufficientStock { .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
