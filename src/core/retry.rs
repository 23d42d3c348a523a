// src/core/retry.rs
//! Retry with exponential backoff, shared by link collection and portal scraping

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::PipelineResult;

const MAX_BACKOFF: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    pub fn no_delay(max_retries: u32) -> Self {
        Self::new(max_retries, Duration::ZERO)
    }

    /// Backoff before retry number `retry` (1-based): base * 2^(retry-1) plus up to 25% jitter.
    pub fn backoff(&self, retry: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let exp = retry.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << exp).min(MAX_BACKOFF);
        let jitter_ms = (delay.as_millis() as u64) / 4;
        let jitter = if jitter_ms > 0 {
            Duration::from_millis(fastrand::u64(0..=jitter_ms))
        } else {
            Duration::ZERO
        };
        delay + jitter
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// retries are exhausted. `op` receives the 0-based attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> PipelineResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = PipelineResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("{} succeeded after {} retries", label, attempt);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff(attempt);
                    warn!(
                        "{} failed ({}), retry {}/{} in {:?}",
                        label, e, attempt, self.max_retries, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_grows_exponentially() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100));
        let first = policy.backoff(1);
        let third = policy.backoff(3);
        assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(125));
        assert!(third >= Duration::from_millis(400) && third <= Duration::from_millis(500));
        assert!(policy.backoff(30) <= MAX_BACKOFF + MAX_BACKOFF / 4);
        assert_eq!(RetryPolicy::no_delay(3).backoff(2), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = AtomicU32::new(0);
        let result = RetryPolicy::no_delay(3)
            .run("flaky", |_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(PipelineError::fetch("u", "503", true))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: PipelineResult<()> = RetryPolicy::no_delay(2)
            .run("always failing", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(PipelineError::fetch("u", "timeout", true)) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_fast() {
        let calls = AtomicU32::new(0);
        let result: PipelineResult<()> = RetryPolicy::no_delay(5)
            .run("not found", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(PipelineError::fetch("u", "HTTP 404", false)) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
