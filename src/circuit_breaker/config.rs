//! Circuit breaker configuration.

use crate::core::EngineError;
use std::time::Duration;

/// Configuration for a circuit breaker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failed attempt cycles before opening the circuit.
    pub failure_threshold: u32,

    /// How long the circuit stays open.
    pub open_duration: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            open_duration: Duration::from_millis(5000),
        }
    }
}

impl CircuitBreakerConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the failure threshold.
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets the open duration.
    pub fn with_open_duration(mut self, duration: Duration) -> Self {
        self.open_duration = duration;
        self
    }

    /// Checks that the configuration can drive a breaker.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.failure_threshold == 0 {
            return Err(EngineError::configuration(
                "circuit breaker failure threshold must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CircuitBreakerConfig::default();
        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.open_duration, Duration::from_millis(5000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = CircuitBreakerConfig::new()
            .with_failure_threshold(10)
            .with_open_duration(Duration::from_secs(60));

        assert_eq!(config.failure_threshold, 10);
        assert_eq!(config.open_duration, Duration::from_secs(60));
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let config = CircuitBreakerConfig::new().with_failure_threshold(0);
        assert!(matches!(
            config.validate(),
            Err(EngineError::Configuration { .. })
        ));
    }
}
