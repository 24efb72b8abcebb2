//! Retry configuration and the deadline-aware retry loop.

use crate::core::EngineError;

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

/// Bounded exponential backoff.
///
/// After failed attempt `n` (1-indexed) the loop waits
/// `initial_delay * multiplier^(n - 1)`, never longer than `max_delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Attempts per request, including the first.
    pub max_attempts: u32,
    /// Wait after the first failed attempt.
    pub initial_delay: Duration,
    /// Cap on any single wait.
    pub max_delay: Duration,
    /// Growth factor between consecutive waits.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Creates a retry configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the attempt budget. At least one attempt is always made.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the first wait.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the wait cap.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the growth factor; values below 1 are raised to 1.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier.max(1.0);
        self
    }

    /// Returns the wait after failed attempt `attempt` (1-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 || self.initial_delay.is_zero() {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let delay_ms = self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);
        let cap_ms = self.max_delay.as_millis() as f64;

        // Overflow to infinity is still capped.
        if delay_ms.is_nan() || delay_ms >= cap_ms {
            return self.max_delay;
        }
        Duration::from_millis(delay_ms as u64)
    }

    /// Returns whether another attempt may follow `attempt` completed ones.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// How a retry loop ended.
#[derive(Debug)]
pub enum RetryOutcome<T> {
    /// An attempt succeeded.
    Succeeded {
        /// The attempt's value.
        value: T,
        /// Attempts made, including the successful one.
        attempts: u32,
    },
    /// Every attempt failed.
    Exhausted {
        /// Error of the final attempt.
        last_error: EngineError,
        /// Attempts made.
        attempts: u32,
    },
    /// The deadline passed during an attempt or a backoff wait.
    Cancelled {
        /// Attempts that completed before the deadline.
        attempts: u32,
    },
}

/// Runs `operation` until it succeeds, attempts run out, or `deadline`
/// passes.
///
/// `operation` receives the attempt number, starting at 1. An attempt that
/// is still running at the deadline is dropped. Every error is retried.
pub async fn retry_with_backoff<F, Fut, T>(
    config: &RetryConfig,
    deadline: Option<Instant>,
    mut operation: F,
) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, EngineError>>,
{
    let mut attempt = 0;
    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return RetryOutcome::Cancelled { attempts: attempt };
        }

        let result = match deadline {
            Some(d) => match tokio::time::timeout_at(d, operation(attempt + 1)).await {
                Ok(result) => result,
                Err(_) => return RetryOutcome::Cancelled { attempts: attempt },
            },
            None => operation(attempt + 1).await,
        };
        attempt += 1;

        let error = match result {
            Ok(value) => return RetryOutcome::Succeeded { value, attempts: attempt },
            Err(e) => e,
        };

        if !config.should_retry(attempt) {
            return RetryOutcome::Exhausted {
                last_error: error,
                attempts: attempt,
            };
        }

        let delay = config.delay_for_attempt(attempt);
        tracing::debug!(
            attempt = attempt,
            max_attempts = config.max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "Retrying operation"
        );

        let wake = Instant::now() + delay;
        match deadline {
            Some(d) if wake > d => {
                tokio::time::sleep_until(d).await;
                return RetryOutcome::Cancelled { attempts: attempt };
            }
            _ => tokio::time::sleep_until(wake).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.initial_delay, Duration::from_millis(100));
        assert_eq!(config.max_delay, Duration::from_secs(10));
    }

    #[test]
    fn test_single_attempt_budget() {
        let config = RetryConfig::new().with_max_attempts(0);
        assert_eq!(config.max_attempts, 1);
        assert!(!config.should_retry(1));
    }

    #[test]
    fn test_delay_calculation() {
        let config = RetryConfig::new().with_initial_delay(Duration::from_millis(100));

        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(400));
    }

    #[test]
    fn test_delay_capped() {
        let config = RetryConfig::new()
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5))
            .with_backoff_multiplier(10.0);

        // 1 * 10 = 10, but capped at 5
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(5));
        assert_eq!(config.delay_for_attempt(40), Duration::from_secs(5));
        assert_eq!(config.delay_for_attempt(5000), Duration::from_secs(5));
    }

    #[test]
    fn test_zero_base_delay_never_waits() {
        let config = RetryConfig::new().with_initial_delay(Duration::ZERO);

        assert_eq!(config.delay_for_attempt(2), Duration::ZERO);
        assert_eq!(config.delay_for_attempt(1100), Duration::ZERO);
        assert_eq!(config.delay_for_attempt(u32::MAX), Duration::ZERO);
    }

    #[test]
    fn test_should_retry() {
        let config = RetryConfig::new().with_max_attempts(3);
        assert!(config.should_retry(0));
        assert!(config.should_retry(1));
        assert!(config.should_retry(2));
        assert!(!config.should_retry(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_after_failures() {
        let config = RetryConfig::new();
        let calls = AtomicU32::new(0);
        let started = Instant::now();

        let outcome = retry_with_backoff(&config, None, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(EngineError::attempt_failed("fast", "boom"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert!(matches!(outcome, RetryOutcome::Succeeded { value: 3, attempts: 3 }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 100 ms + 200 ms of backoff
        assert_eq!(started.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausted() {
        let config = RetryConfig::new().with_max_attempts(2);
        let started = Instant::now();

        let outcome: RetryOutcome<()> = retry_with_backoff(&config, None, |_| async {
            Err(EngineError::attempt_failed("safe", "boom"))
        })
        .await;

        match outcome {
            RetryOutcome::Exhausted { last_error, attempts } => {
                assert_eq!(attempts, 2);
                assert!(last_error.is_recoverable());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        // No wait after the final attempt.
        assert_eq!(started.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_during_backoff() {
        let config = RetryConfig::new().with_initial_delay(Duration::from_secs(1));
        let started = Instant::now();
        let deadline = started + Duration::from_millis(500);

        let outcome: RetryOutcome<()> = retry_with_backoff(&config, Some(deadline), |_| async {
            Err(EngineError::attempt_failed("fast", "boom"))
        })
        .await;

        assert!(matches!(outcome, RetryOutcome::Cancelled { attempts: 1 }));
        assert_eq!(started.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_during_attempt() {
        let config = RetryConfig::new();
        let deadline = Instant::now() + Duration::from_millis(50);

        let outcome = retry_with_backoff(&config, Some(deadline), |_| async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok(())
        })
        .await;

        assert!(matches!(outcome, RetryOutcome::Cancelled { attempts: 0 }));
    }
}
