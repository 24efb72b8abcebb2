//! Error types for the adaptive engine.
//!
//! Downstream faults are absorbed by the engine (retried, then healed), so
//! most variants here describe a single failed attempt. Only configuration
//! and lifecycle errors ever reach a caller of `process_request`.

use std::time::Duration;
use thiserror::Error;

/// The main error type for engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A single attempt against the dependency failed.
    #[error("attempt with strategy '{strategy}' failed: {reason}")]
    AttemptFailed {
        /// Strategy that was used for the attempt.
        strategy: String,
        /// Human-readable reason for the failure.
        reason: String,
    },

    /// An attempt did not finish within the per-attempt timeout.
    #[error("attempt with strategy '{strategy}' timed out after {elapsed:?}")]
    Timeout {
        /// Strategy that was used for the attempt.
        strategy: String,
        /// How long the attempt ran before it was abandoned.
        elapsed: Duration,
    },

    /// The dependency could not be reached.
    #[error("connection to dependency '{dependency}' failed: {message}")]
    ConnectionFailed {
        /// Name of the dependency.
        dependency: String,
        /// Error message describing the failure.
        message: String,
    },

    /// The dependency reported itself as unavailable.
    #[error("dependency '{dependency}' is unavailable: {reason}")]
    DependencyUnavailable {
        /// Name of the dependency.
        dependency: String,
        /// Reason for unavailability.
        reason: String,
    },

    /// A strategy name was requested that the strategy table does not hold.
    #[error("unknown strategy '{name}'")]
    UnknownStrategy {
        /// The requested strategy name.
        name: String,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// The caller's deadline passed before processing finished.
    #[error("request processing was cancelled")]
    Cancelled,

    /// The engine has been torn down.
    #[error("engine has been shut down")]
    ShutDown,
}

impl EngineError {
    /// Returns `true` if this error describes a transient attempt failure
    /// that the retry controller should retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::AttemptFailed { .. }
                | Self::Timeout { .. }
                | Self::ConnectionFailed { .. }
                | Self::DependencyUnavailable { .. }
        )
    }

    /// Returns `true` if this error is a configuration problem rather than a
    /// request-processing failure.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::UnknownStrategy { .. })
    }

    /// Returns the strategy name if this error is associated with one.
    pub fn strategy(&self) -> Option<&str> {
        match self {
            Self::AttemptFailed { strategy, .. } | Self::Timeout { strategy, .. } => Some(strategy),
            Self::UnknownStrategy { name } => Some(name),
            _ => None,
        }
    }

    /// Creates an `AttemptFailed` error.
    pub fn attempt_failed(strategy: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::AttemptFailed {
            strategy: strategy.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `Timeout` error.
    pub fn timeout(strategy: impl Into<String>, elapsed: Duration) -> Self {
        Self::Timeout {
            strategy: strategy.into(),
            elapsed,
        }
    }

    /// Creates a `ConnectionFailed` error.
    pub fn connection_failed(dependency: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionFailed {
            dependency: dependency.into(),
            message: message.into(),
        }
    }

    /// Creates a `DependencyUnavailable` error.
    pub fn dependency_unavailable(dependency: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DependencyUnavailable {
            dependency: dependency.into(),
            reason: reason.into(),
        }
    }

    /// Creates an `UnknownStrategy` error.
    pub fn unknown_strategy(name: impl Into<String>) -> Self {
        Self::UnknownStrategy { name: name.into() }
    }

    /// Creates a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// A specialized `Result` type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_is_recoverable() {
        let timeout = EngineError::timeout("fast", Duration::from_secs(30));
        assert!(timeout.is_recoverable());

        let failed = EngineError::attempt_failed("safe", "boom");
        assert!(failed.is_recoverable());

        assert!(!EngineError::Cancelled.is_recoverable());
        assert!(!EngineError::unknown_strategy("nope").is_recoverable());
    }

    #[test]
    fn test_engine_error_strategy() {
        let err = EngineError::attempt_failed("balanced", "simulated failure");
        assert_eq!(err.strategy(), Some("balanced"));

        let err = EngineError::connection_failed("payments-api", "refused");
        assert_eq!(err.strategy(), None);
    }

    #[test]
    fn test_configuration_classification() {
        assert!(EngineError::configuration("bad").is_configuration());
        assert!(EngineError::unknown_strategy("x").is_configuration());
        assert!(!EngineError::ShutDown.is_configuration());
    }

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::unknown_strategy("turbo");
        assert_eq!(err.to_string(), "unknown strategy 'turbo'");

        let err = EngineError::dependency_unavailable("db", "maintenance");
        assert!(err.to_string().contains("maintenance"));
    }
}
