//! Mock dependency for testing.
//!
//! This module provides a configurable mock dependency that can be used in
//! tests to drive the engine through exact success/failure sequences without
//! randomness.

use crate::core::{AttemptContext, AttemptOutcome, Dependency, EngineError};

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

/// A mock dependency for testing purposes.
///
/// Outcomes are decided in this order: an unavailable mock always fails;
/// otherwise the next scripted outcome is used if any remain; otherwise the
/// deterministic fail rate decides.
///
/// # Examples
///
/// ```rust
/// use adaptive_engine::dependency::MockDependency;
/// use std::time::Duration;
///
/// // Always succeeds, reporting 40 ms.
/// let dep = MockDependency::new().with_reported_latency_ms(40.0);
///
/// // Fails twice, then succeeds.
/// let flaky = MockDependency::new().with_script([false, false, true]);
///
/// // Always fails after a simulated 20 ms.
/// let down = MockDependency::failing().with_latency(Duration::from_millis(20));
/// ```
#[derive(Debug)]
pub struct MockDependency {
    /// Name of this dependency instance.
    name: String,
    /// Simulated latency per attempt.
    latency: Option<Duration>,
    /// Latency reported on success; `None` echoes the strategy's estimate.
    reported_latency_ms: Option<f64>,
    /// Probability of failure (0.0 to 1.0).
    fail_rate: f32,
    /// Scripted outcomes consumed before the fail rate applies.
    script: Mutex<VecDeque<bool>>,
    /// Counter for attempts.
    call_count: AtomicU64,
    /// Whether every attempt reports the dependency unavailable.
    unavailable: RwLock<bool>,
}

impl MockDependency {
    /// Creates a mock dependency that always succeeds.
    pub fn new() -> Self {
        Self {
            name: "mock".to_string(),
            latency: None,
            reported_latency_ms: None,
            fail_rate: 0.0,
            script: Mutex::new(VecDeque::new()),
            call_count: AtomicU64::new(0),
            unavailable: RwLock::new(false),
        }
    }

    /// Creates a mock dependency that always fails.
    pub fn failing() -> Self {
        Self::new().with_fail_rate(1.0)
    }

    /// Sets the name of this dependency.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the simulated latency per attempt.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Sets the latency reported on success.
    pub fn with_reported_latency_ms(mut self, latency_ms: f64) -> Self {
        self.reported_latency_ms = Some(latency_ms);
        self
    }

    /// Sets the probability of failure.
    pub fn with_fail_rate(mut self, rate: f32) -> Self {
        self.fail_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Queues scripted outcomes (`true` = success).
    pub fn with_script(self, outcomes: impl IntoIterator<Item = bool>) -> Self {
        self.push_script(outcomes);
        self
    }

    /// Queues scripted outcomes on a shared mock.
    pub fn push_script(&self, outcomes: impl IntoIterator<Item = bool>) {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend(outcomes);
    }

    /// Returns the number of attempts made.
    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Sets the availability status.
    pub fn set_available(&self, available: bool) {
        *self
            .unavailable
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = !available;
    }

    /// Makes every attempt fail with `DependencyUnavailable`.
    pub fn make_unavailable(&self) {
        self.set_available(false);
    }

    /// Makes the dependency available again.
    pub fn make_available(&self) {
        self.set_available(true);
    }

    fn next_scripted(&self) -> Option<bool> {
        self.script
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front()
    }

    fn should_fail(&self) -> bool {
        if self.fail_rate <= 0.0 {
            return false;
        }
        if self.fail_rate >= 1.0 {
            return true;
        }
        // Deterministic spread over the attempt count.
        let count = self.call_count.load(Ordering::Relaxed);
        (count as f32 * 0.618033988749895) % 1.0 < self.fail_rate
    }
}

impl Default for MockDependency {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Dependency for MockDependency {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt(&self, ctx: &AttemptContext<'_>) -> Result<AttemptOutcome, EngineError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if *self
            .unavailable
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
        {
            return Err(EngineError::dependency_unavailable(
                &self.name,
                "mock dependency is unavailable",
            ));
        }

        let succeed = match self.next_scripted() {
            Some(outcome) => outcome,
            None => !self.should_fail(),
        };
        if !succeed {
            return Err(EngineError::attempt_failed(ctx.strategy, "simulated failure"));
        }

        let latency_ms = self.reported_latency_ms.unwrap_or_else(|| {
            self.latency
                .map(|l| l.as_secs_f64() * 1000.0)
                .unwrap_or(ctx.expected_latency_ms)
        });
        Ok(AttemptOutcome::new(latency_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Request, RequestType};

    fn context(request: &Request) -> AttemptContext<'_> {
        AttemptContext {
            request,
            strategy: "balanced",
            expected_latency_ms: 150.0,
            attempt: 1,
        }
    }

    #[tokio::test]
    async fn test_mock_dependency_succeeds() {
        let dep = MockDependency::new();
        let request = Request::new(RequestType::ApiCall);

        let outcome = dep.attempt(&context(&request)).await.unwrap();
        assert_eq!(outcome.latency_ms, 150.0);
        assert_eq!(dep.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_dependency_script() {
        let dep = MockDependency::new()
            .with_reported_latency_ms(20.0)
            .with_script([false, true]);
        let request = Request::new(RequestType::Database);

        assert!(dep.attempt(&context(&request)).await.is_err());
        let outcome = dep.attempt(&context(&request)).await.unwrap();
        assert_eq!(outcome.latency_ms, 20.0);

        // Script exhausted; fail rate 0 means success.
        assert!(dep.attempt(&context(&request)).await.is_ok());
        assert_eq!(dep.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_dependency_availability() {
        let dep = MockDependency::new().with_name("payments-api");
        let request = Request::new(RequestType::Payment);
        assert_eq!(dep.name(), "payments-api");

        dep.make_unavailable();
        let err = dep.attempt(&context(&request)).await.unwrap_err();
        match err {
            EngineError::DependencyUnavailable { dependency, .. } => {
                assert_eq!(dependency, "payments-api");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        dep.make_available();
        assert!(dep.attempt(&context(&request)).await.is_ok());
    }

    #[tokio::test]
    async fn test_mock_dependency_fail_rate() {
        let dep = MockDependency::new().with_fail_rate(0.5);
        let request = Request::new(RequestType::ApiCall);

        let mut failures = 0;
        for _ in 0..100 {
            if dep.attempt(&context(&request)).await.is_err() {
                failures += 1;
            }
        }
        assert!((40..=60).contains(&failures), "failures = {}", failures);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_dependency_latency() {
        let dep = MockDependency::failing().with_latency(Duration::from_millis(25));
        let request = Request::new(RequestType::ApiCall);

        let started = tokio::time::Instant::now();
        assert!(dep.attempt(&context(&request)).await.is_err());
        assert_eq!(started.elapsed(), Duration::from_millis(25));
    }
}
