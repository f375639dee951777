//! Bounded retry with exponential backoff

use std::future::Future;
use std::time::Duration;
use tracing::{info, warn};

/// How often and how patiently an operation is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,

    /// Delay before the second attempt; doubled after each failure
    pub initial_delay: Duration,

    /// Upper bound for the delay between two attempts
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_millis(500);
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

    /// Retries without waiting between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay to wait after the given failed attempt (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            initial_delay: Self::DEFAULT_INITIAL_DELAY,
            max_delay: Self::DEFAULT_MAX_DELAY,
        }
    }
}

/// Runs `op` until it succeeds, fails permanently or runs out of attempts
///
/// # Arguments
/// * `policy` - Attempt count and backoff
/// * `operation` - Name used in log messages
/// * `op` - Produces a fresh future for every attempt
/// * `should_retry` - Decides whether an error is worth another attempt
///
/// # Returns
/// The first success, or the last error
pub async fn retry_with<T, E, F, Fut, R>(
    policy: &RetryPolicy,
    operation: &str,
    mut op: F,
    should_retry: R,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    info!("{} succeeded after {} attempt(s)", operation, attempt);
                }
                return Ok(value);
            }
            Err(e) => {
                if attempt >= max_attempts || !should_retry(&e) {
                    return Err(e);
                }

                let delay = policy.delay_after(attempt);
                warn!(
                    "{} failed (attempt {}/{}): {}",
                    operation, attempt, max_attempts, e
                );
                warn!("Retrying in {} ms...", delay.as_millis());

                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(3),
        };

        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(3), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(4), Duration::from_secs(3));
        assert_eq!(policy.delay_after(40), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<&str, String> = retry_with(
            &RetryPolicy::immediate(3),
            "upload",
            move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err("flaky".to_string())
                } else {
                    Ok("hash")
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result, Ok("hash"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_returns_last_error_when_exhausted() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), String> = retry_with(
            &RetryPolicy::immediate(3),
            "upload",
            move || async move {
                let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Err(format!("failure {}", attempt))
            },
            |_| true,
        )
        .await;

        assert_eq!(result, Err("failure 3".to_string()));
    }

    #[tokio::test]
    async fn test_permanent_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), String> = retry_with(
            &RetryPolicy::immediate(3),
            "upload",
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err("rejected".to_string())
            },
            |_| false,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
