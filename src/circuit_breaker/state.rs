//! Circuit breaker state.

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// The timestamp-based state of a circuit breaker.
///
/// There is no explicit half-open state: the circuit is open exactly while
/// `open_until` lies in the future, and the first request after that is
/// attempted normally.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CircuitState {
    /// Consecutive failed attempt cycles since the last success.
    pub failure_count: u32,
    /// When the open window ends, if the circuit has been opened.
    pub open_until: Option<Instant>,
}

impl CircuitState {
    /// Creates a new closed state.
    pub fn closed() -> Self {
        Self::default()
    }

    /// Returns `true` if the circuit is open at `now`.
    pub fn is_open_at(&self, now: Instant) -> bool {
        self.open_until.is_some_and(|until| until > now)
    }

    /// Returns `true` if the circuit is open right now.
    pub fn is_open(&self) -> bool {
        self.is_open_at(Instant::now())
    }

    /// Returns the name of the state at `now`.
    pub fn name_at(&self, now: Instant) -> &'static str {
        if self.is_open_at(now) {
            "open"
        } else {
            "closed"
        }
    }
}

/// Metrics about circuit breaker behavior.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakerMetrics {
    /// Failed attempt cycles recorded.
    pub failures: u64,
    /// Requests short-circuited while open.
    pub rejected_requests: u64,
    /// Number of times the circuit has opened.
    pub times_opened: u64,
    /// Number of times a failing circuit was closed by a success.
    pub times_closed: u64,
}

impl BreakerMetrics {
    /// Creates new empty metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a failed attempt cycle.
    pub fn record_failure(&mut self) {
        self.failures += 1;
    }

    /// Records a rejected request.
    pub fn record_rejected(&mut self) {
        self.rejected_requests += 1;
    }

    /// Records that the circuit opened.
    pub fn record_opened(&mut self) {
        self.times_opened += 1;
    }

    /// Records that the circuit closed.
    pub fn record_closed(&mut self) {
        self.times_closed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_circuit_state_default() {
        let state = CircuitState::default();
        assert_eq!(state.failure_count, 0);
        assert!(!state.is_open());
    }

    #[test]
    fn test_open_window_is_strict() {
        let now = Instant::now();
        let state = CircuitState {
            failure_count: 3,
            open_until: Some(now + Duration::from_millis(100)),
        };

        assert!(state.is_open_at(now));
        assert_eq!(state.name_at(now), "open");
        assert!(!state.is_open_at(now + Duration::from_millis(100)));
        assert_eq!(state.name_at(now + Duration::from_millis(150)), "closed");
    }

    #[test]
    fn test_metrics() {
        let mut metrics = BreakerMetrics::new();
        metrics.record_failure();
        metrics.record_failure();
        metrics.record_opened();
        metrics.record_rejected();

        assert_eq!(metrics.failures, 2);
        assert_eq!(metrics.times_opened, 1);
        assert_eq!(metrics.rejected_requests, 1);
        assert_eq!(metrics.times_closed, 0);
    }
}
