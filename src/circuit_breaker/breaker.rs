//! Circuit breaker implementation.

use crate::circuit_breaker::config::CircuitBreakerConfig;
use crate::circuit_breaker::state::{BreakerMetrics, CircuitState};

use std::time::Duration;
use tokio::time::Instant;

/// A timestamp-based circuit breaker guarding one dependency.
///
/// The breaker counts failed attempt cycles (a request whose retries were
/// all exhausted). Once the count reaches the threshold the circuit opens
/// for `open_duration`; while open, requests are answered with a fallback
/// and the dependency is not called. When the window elapses the next
/// request goes through normally.
///
/// The failure count is only reset by a success, so after an open window a
/// single further failure reopens the circuit.
///
/// The breaker holds no lock of its own; the engine keeps it inside its
/// state so that increment-then-compare runs in one critical section.
///
/// # Example
///
/// ```rust
/// use adaptive_engine::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
///
/// let mut breaker = CircuitBreaker::new(CircuitBreakerConfig::default().with_failure_threshold(2));
/// assert!(!breaker.record_failure());
/// assert!(breaker.record_failure());
/// assert!(breaker.is_open());
/// ```
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    /// Current state of the circuit.
    state: CircuitState,
    /// Configuration.
    config: CircuitBreakerConfig,
    /// Metrics.
    metrics: BreakerMetrics,
}

impl CircuitBreaker {
    /// Creates a new closed circuit breaker.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            state: CircuitState::closed(),
            config,
            metrics: BreakerMetrics::new(),
        }
    }

    /// Creates a new circuit breaker with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }

    /// Returns the current state of the circuit breaker.
    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Returns a copy of the current metrics.
    pub fn metrics(&self) -> BreakerMetrics {
        self.metrics.clone()
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Returns `true` while the open window has not elapsed.
    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }

    /// Returns how long the circuit will stay open, if it is open.
    pub fn remaining_open(&self) -> Option<Duration> {
        let now = Instant::now();
        self.state
            .open_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    /// Checks whether a request may reach the dependency.
    ///
    /// Returns `false` and counts a rejection while the circuit is open.
    pub fn allow_request(&mut self) -> bool {
        if self.is_open() {
            self.metrics.record_rejected();
            false
        } else {
            true
        }
    }

    /// Opens the circuit for the configured duration, starting now.
    pub fn open(&mut self) {
        self.state.open_until = Some(Instant::now() + self.config.open_duration);
        self.metrics.record_opened();
    }

    /// Closes the circuit and resets the failure count.
    ///
    /// Returns `true` if the breaker had recorded failures, i.e. this call
    /// was a real recovery rather than a no-op on a healthy circuit.
    pub fn close(&mut self) -> bool {
        let was_failing = self.state.failure_count > 0 || self.state.open_until.is_some();
        self.state = CircuitState::closed();
        if was_failing {
            self.metrics.record_closed();
        }
        was_failing
    }

    /// Records a failed attempt cycle.
    ///
    /// Returns `true` if this failure opened the circuit.
    pub fn record_failure(&mut self) -> bool {
        self.state.failure_count = self.state.failure_count.saturating_add(1);
        self.metrics.record_failure();

        if self.state.failure_count >= self.config.failure_threshold {
            self.open();
            true
        } else {
            false
        }
    }

    /// Forces the circuit into the open state.
    pub fn force_open(&mut self) {
        self.open();
    }

    /// Forces the circuit into the closed state.
    pub fn force_close(&mut self) {
        self.close();
    }

    /// Resets the circuit breaker state and metrics.
    pub fn reset(&mut self) {
        self.state = CircuitState::closed();
        self.metrics = BreakerMetrics::new();
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_circuit_opens_at_threshold() {
        let config = CircuitBreakerConfig::default().with_failure_threshold(3);
        let mut breaker = CircuitBreaker::new(config);

        assert!(!breaker.record_failure());
        assert!(!breaker.record_failure());
        assert!(!breaker.is_open());

        assert!(breaker.record_failure());
        assert!(breaker.is_open());
        assert_eq!(breaker.metrics().times_opened, 1);
        assert_eq!(breaker.state().failure_count, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_circuit_rejects_when_open() {
        let mut breaker = CircuitBreaker::with_defaults();
        assert!(breaker.allow_request());

        breaker.force_open();
        assert!(!breaker.allow_request());
        assert_eq!(breaker.metrics().rejected_requests, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_circuit_window_elapses() {
        let config = CircuitBreakerConfig::default()
            .with_failure_threshold(1)
            .with_open_duration(Duration::from_millis(5000));
        let mut breaker = CircuitBreaker::new(config);

        breaker.record_failure();
        assert!(breaker.is_open());
        assert!(breaker.remaining_open().is_some());

        tokio::time::advance(Duration::from_millis(4999)).await;
        assert!(breaker.is_open());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(!breaker.is_open());
        assert!(breaker.remaining_open().is_none());
        assert!(breaker.allow_request());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_after_window_reopens() {
        let config = CircuitBreakerConfig::default()
            .with_failure_threshold(2)
            .with_open_duration(Duration::from_millis(100));
        let mut breaker = CircuitBreaker::new(config);

        breaker.record_failure();
        breaker.record_failure();
        tokio::time::advance(Duration::from_millis(150)).await;
        assert!(!breaker.is_open());

        assert!(breaker.record_failure());
        assert!(breaker.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_closes_and_resets() {
        let mut breaker = CircuitBreaker::with_defaults();
        assert!(!breaker.close());

        breaker.record_failure();
        assert!(breaker.close());
        assert_eq!(breaker.state(), CircuitState::closed());
        assert_eq!(breaker.metrics().times_closed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_force_open_close_and_reset() {
        let mut breaker = CircuitBreaker::with_defaults();

        breaker.force_open();
        assert!(breaker.is_open());

        breaker.force_close();
        assert!(!breaker.is_open());

        breaker.record_failure();
        breaker.reset();
        assert_eq!(breaker.state().failure_count, 0);
        assert_eq!(breaker.metrics(), BreakerMetrics::new());
    }
}
