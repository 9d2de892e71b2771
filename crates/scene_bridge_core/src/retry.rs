use crate::{Result, TransportError};
use std::future::Future;
use std::time::Duration;

/// Bounded, fixed-delay retry schedule for connection-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one. Zero is treated as one.
    pub attempts: u32,
    /// Pause between two consecutive attempts. Not applied after the last one.
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    pub const fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    fn bound(&self) -> u32 {
        self.attempts.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(1))
    }
}

/// Runs `attempt` until it succeeds, fails with a non-retryable error, or the
/// policy is exhausted. `attempt` receives the 1-based attempt number.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, mut attempt: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let bound = policy.bound();
    let mut last_error = String::new();

    for n in 1..=bound {
        match attempt(n).await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() => {
                tracing::warn!("Connection attempt {}/{} failed: {}", n, bound, err);
                last_error = err.to_string();
                if n < bound {
                    tokio::time::sleep(policy.delay).await;
                }
            }
            Err(err) => return Err(err),
        }
    }

    Err(TransportError::unreachable(bound, last_error))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    const FAST: Duration = Duration::from_millis(1);

    #[tokio::test]
    async fn test_exact_attempt_count_when_always_failing() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = retry(RetryPolicy::new(4, FAST), move |_| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::Connection("refused".into()))
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match result {
            Err(TransportError::Unreachable { attempts, message }) => {
                assert_eq!(attempts, 4);
                assert!(message.contains("refused"));
            }
            other => panic!("Expected Unreachable, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_terminal_error_is_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: Result<()> = retry(RetryPolicy::new(5, FAST), move |_| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::rejected(500, "no such type"))
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(TransportError::Rejected { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_recovers_on_later_attempt() {
        let result = retry(RetryPolicy::new(3, FAST), |n| async move {
            if n < 3 {
                Err(TransportError::Connection("not yet".into()))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let calls = &AtomicU32::new(0);
        let _: Result<()> = retry(RetryPolicy::new(0, FAST), move |_| async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::Connection("refused".into()))
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_sleep_after_final_attempt() {
        let start = std::time::Instant::now();
        let _: Result<()> = retry(RetryPolicy::new(1, Duration::from_secs(5)), |_| async {
            Err(TransportError::Connection("refused".into()))
        })
        .await;

        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
