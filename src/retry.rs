//! Retry with exponential backoff for remote calls.

use std::future::Future;
use std::time::Duration;

use crate::error::CatfreqError;

/// How often and how patiently a request is retried.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub base_delay: Duration,
    /// Factor applied to the delay after each further failed attempt.
    pub backoff_factor: f64,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    pub fn new(max_attempts: u32, base_delay: Duration, backoff_factor: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff_factor,
        }
    }

    /// Policy for category listing requests: 3 attempts, 2s, 4s.
    pub fn listing() -> Self {
        RetryPolicy::new(Self::DEFAULT_MAX_ATTEMPTS, Duration::from_secs(2), 2.0)
    }

    /// Policy for article content requests: 3 attempts, 1s, 2s.
    pub fn content() -> Self {
        RetryPolicy::new(Self::DEFAULT_MAX_ATTEMPTS, Duration::from_secs(1), 2.0)
    }

    /// A single attempt.
    pub fn none() -> Self {
        RetryPolicy::new(1, Duration::from_secs(0), 1.0)
    }

    /// The delay to wait after the `failed_attempt`th (1-based) attempt failed.
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        let exp = failed_attempt.saturating_sub(1) as i32;
        self.base_delay.mul_f64(self.backoff_factor.powi(exp))
    }

    /// All delays of a request that fails every attempt.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts).map(|n| self.delay_after(n)).collect()
    }
}

/// Runs `operation` until it succeeds, fails with a permanent error or the
/// policy's attempts are used up. The last error is returned.
pub async fn execute_with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    what: &str,
    mut operation: F,
) -> Result<T, CatfreqError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CatfreqError>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    log::info!("{} succeeded after {} attempts", what, attempt);
                }
                return Ok(value);
            }
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                let delay = policy.delay_after(attempt);
                log::warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                    what,
                    attempt,
                    policy.max_attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                log::warn!(
                    "{} failed (attempt {}/{}), giving up: {}",
                    what,
                    attempt,
                    policy.max_attempts,
                    e
                );
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn unavailable() -> CatfreqError {
        CatfreqError::NoHttpSuccess {
            status: StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    #[test]
    fn backoff_schedule() {
        assert_eq!(
            RetryPolicy::listing().schedule(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
        assert_eq!(
            RetryPolicy::content().schedule(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
        assert!(RetryPolicy::none().schedule().is_empty());
        assert_eq!(RetryPolicy::new(0, Duration::from_secs(1), 2.0).max_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let res: Result<(), _> = execute_with_retry(&RetryPolicy::listing(), "listing", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(unavailable()) }
        })
        .await;

        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_then_succeed() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let res = execute_with_retry(&RetryPolicy::content(), "content", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(CatfreqError::malformed("missing query"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(res.unwrap(), 1);
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);

        let res: Result<(), _> = execute_with_retry(&RetryPolicy::content(), "content", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async {
                Err(CatfreqError::NoHttpSuccess {
                    status: StatusCode::FORBIDDEN,
                })
            }
        })
        .await;

        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
