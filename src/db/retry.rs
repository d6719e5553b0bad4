//! Bounded retry with linear backoff.
//!
//! One combinator covers both the read and insert paths. Each call carries
//! its own retry budget; nothing is shared across calls. The classifier is
//! `CrmError::is_transient` - a malformed statement fails on the first
//! attempt instead of burning the whole budget.

use crate::error::{CrmError, CrmResult};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry parameters: at most `max_retries` attempts in total, sleeping
/// `base_delay * k` before attempt `k + 1` (k is the 1-based index of the
/// failed attempt).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            base_delay,
        }
    }

    /// Backoff before the attempt following failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

/// Run `op` under the retry policy.
///
/// Transient failures are retried until the budget is exhausted, then
/// surfaced as [`CrmError::QueryExecution`] carrying the attempt count and
/// the last underlying error. Permanent failures propagate immediately.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, operation: &str, mut op: F) -> CrmResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CrmResult<T>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_retries => {
                let delay = policy.delay_after(attempt);
                warn!(
                    operation = operation,
                    attempt = attempt,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) if err.is_transient() => {
                return Err(CrmError::query_execution(attempt, err.to_string()));
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn policy() -> RetryPolicy {
        RetryPolicy::default()
    }

    #[test]
    fn test_delay_is_linear_in_attempt_index() {
        let p = policy();
        assert_eq!(p.delay_after(1), Duration::from_millis(1000));
        assert_eq!(p.delay_after(2), Duration::from_millis(2000));
        assert_eq!(p.delay_after(3), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt_consumes_no_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let result = with_retry(policy(), "probe", move || {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, CrmError>(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_retry_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let start = tokio::time::Instant::now();
        let result = with_retry(policy(), "query", move || {
            let calls = calls2.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(CrmError::connection("gone away"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // Paused clock: elapsed time is exactly the sum of the backoffs,
        // base * 1 + base * 2.
        assert_eq!(start.elapsed(), Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_reports_attempt_count_and_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let result: CrmResult<()> = with_retry(policy(), "query", move || {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CrmError::timeout("query execution", 30))
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(CrmError::QueryExecution { attempts, message }) => {
                assert_eq!(attempts, 3);
                assert!(message.contains("query execution"));
            }
            other => panic!("expected QueryExecution, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let result: CrmResult<()> = with_retry(policy(), "query", move || {
            let calls = calls2.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CrmError::database(
                    "You have an error in your SQL syntax",
                    Some("1064".to_string()),
                ))
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(CrmError::Database { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadlock_code_is_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let result = with_retry(policy(), "insert", move || {
            let calls = calls2.clone();
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(CrmError::database("Deadlock found", Some("1213".into())))
                } else {
                    Ok(1u64)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
