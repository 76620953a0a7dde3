//! Retry with exponential backoff
//!
//! Available to node implementations and service adapters for their own
//! sub-operations. The executor never retries a failed node.

use super::WorkflowError;
use std::future::Future;
use std::time::Duration;

/// Errors that can tell whether another attempt is worthwhile
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for WorkflowError {
    fn is_retryable(&self) -> bool {
        self.recoverable && !self.kind.is_security()
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retries (total attempts = max_retries + 1)
    pub max_retries: u32,

    /// Delay before the first retry
    pub base_delay: Duration,

    /// Upper bound for a single delay, before jitter
    pub max_delay: Duration,

    /// Whether to add up to 10% jitter to delays
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Create a policy with the default max delay
    pub fn new(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            max_retries,
            base_delay: Duration::from_millis(base_delay_ms),
            ..Default::default()
        }
    }

    /// Set the max delay
    pub fn with_max_delay(mut self, max_delay_ms: u64) -> Self {
        self.max_delay = Duration::from_millis(max_delay_ms);
        self
    }

    /// Enable or disable jitter
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Calculate delay for a given attempt number (0-based)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as f64 * 2f64.powi(attempt.min(62) as i32);
        let capped_ms = base_ms.min(self.max_delay.as_millis() as f64);

        let delay_ms = if self.jitter {
            // Up to 10% jitter
            capped_ms + rand::random::<f64>() * 0.1 * capped_ms
        } else {
            capped_ms
        };

        Duration::from_micros((delay_ms * 1000.0).round() as u64)
    }
}

/// Run `operation` until it succeeds, fails non-retryably, or attempts run out
pub async fn retry_with_backoff<T, E, F, Fut>(
    mut operation: F,
    policy: &RetryPolicy,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !e.is_retryable() || attempt >= policy.max_retries {
                    return Err(e);
                }

                let delay = policy.delay_for_attempt(attempt);
                tracing::debug!(
                    attempt = attempt + 1,
                    max_attempts = policy.max_retries + 1,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying after failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result = retry_with_backoff(
            || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err(WorkflowError::network("connection reset"))
                    } else {
                        Ok("success")
                    }
                }
            },
            &RetryPolicy::new(3, 10),
        )
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_retry_on_security_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let start = Instant::now();

        let result: Result<(), WorkflowError> = retry_with_backoff(
            || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(WorkflowError::security_violation("forbidden"))
                }
            },
            &RetryPolicy::new(3, 10),
        )
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::SecurityViolation);
        assert_eq!(err.message, "forbidden");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_no_retry_on_non_recoverable() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), WorkflowError> = retry_with_backoff(
            || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(WorkflowError::configuration("missing key").with_recoverable(false))
                }
            },
            &RetryPolicy::new(5, 1),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_exhausted_returns_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();

        let result: Result<(), WorkflowError> = retry_with_backoff(
            || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    Err(WorkflowError::timeout(format!("attempt {}", n)))
                }
            },
            &RetryPolicy::new(2, 1).with_jitter(false),
        )
        .await;

        assert_eq!(result.unwrap_err().message, "attempt 2");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_retry_policy_delays() {
        let policy = RetryPolicy::new(5, 100)
            .with_max_delay(500)
            .with_jitter(false);

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(500));
        assert_eq!(policy.delay_for_attempt(40), Duration::from_millis(500));
    }

    #[test]
    fn test_retry_policy_with_jitter() {
        let policy = RetryPolicy::new(3, 1000);

        let delay = policy.delay_for_attempt(0);
        assert!(delay >= Duration::from_millis(1000));
        assert!(delay <= Duration::from_millis(1100));
    }
}
