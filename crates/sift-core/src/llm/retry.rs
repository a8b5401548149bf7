//! Bounded retry with exponential backoff for provider calls.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

use super::LLMError;
use crate::config::HttpConfig;

/// Errors that can tell a transient failure from a permanent one.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

impl Retryable for LLMError {
    fn is_retryable(&self) -> bool {
        LLMError::is_retryable(self)
    }
}

/// Retry budget for a single logical call.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from(&HttpConfig::default())
    }
}

impl From<&HttpConfig> for RetryPolicy {
    fn from(http: &HttpConfig) -> Self {
        Self {
            max_retries: http.max_retries,
            initial_backoff_ms: http.initial_backoff_ms,
            max_backoff_ms: http.max_backoff_ms,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt);
        let ms = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}

/// Execute an async operation, retrying transient failures.
///
/// Permanent errors (bad request, parse, structured decode) return immediately.
pub async fn with_retry<F, Fut, T, E>(policy: &RetryPolicy, operation: F) -> Result<T, E>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.backoff(attempt);
                warn!(
                    attempt = attempt + 1,
                    max = policy.max_retries,
                    backoff_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retrying after transient error"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_backoff_ms: 500,
            max_backoff_ms: 3000,
        };
        assert_eq!(policy.backoff(0), Duration::from_millis(500));
        assert_eq!(policy.backoff(1), Duration::from_millis(1000));
        assert_eq!(policy.backoff(3), Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&instant_policy(2), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(LLMError::RateLimited)
            } else {
                Ok("done")
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&instant_policy(1), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LLMError::Network("refused".into()))
        })
        .await;
        assert!(matches!(result, Err(LLMError::Network(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&instant_policy(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LLMError::ParseError("bad".into()))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
