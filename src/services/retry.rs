//! Bounded retry with exponential backoff for remote queries.

use std::{future::Future, time::Duration};

use tracing::warn;

use crate::error::{AppError, Result};

/// Retry configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failure; doubled after each further failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_millis(1000) }
    }
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// Run `operation` until it succeeds or the attempts are exhausted.
    ///
    /// The closure receives the 1-based attempt number. Waiting happens on the
    /// Tokio timer, so other tasks keep running during backoff. After the last
    /// failure the error is wrapped in `RemoteQueryFailed`.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts.max(1);

        let mut attempt = 1;
        loop {
            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) if attempt >= max_attempts => {
                    warn!(label, attempt, error = %err, "Giving up after final attempt");
                    return Err(AppError::RemoteQueryFailed {
                        attempts: attempt,
                        message: err.to_string(),
                    });
                }
                Err(err) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_two_failures() {
        let calls = AtomicU32::new(0);
        let started = tokio::time::Instant::now();

        let result = RetryPolicy::default()
            .run("test", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(AppError::Transport(format!("attempt {} failed", attempt)))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_attempts() {
        let result: Result<()> = RetryPolicy::default()
            .run("test", |_| async { Err(AppError::Transport("status 503".into())) })
            .await;

        match result.unwrap_err() {
            AppError::RemoteQueryFailed { attempts, message } => {
                assert_eq!(attempts, 3);
                assert!(message.contains("status 503"));
            }
            other => panic!("Expected RemoteQueryFailed, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_wait_on_first_success() {
        let started = tokio::time::Instant::now();
        let value = RetryPolicy::default().run("test", |_| async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }
}
