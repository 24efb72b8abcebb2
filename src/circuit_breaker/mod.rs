//! Circuit breaker protecting the engine's downstream dependency.
//!
//! The breaker stops traffic to a failing dependency for a fixed window
//! after repeated failed attempt cycles.
//!
//! ## States
//!
//! - **Closed**: Normal operation; requests pass through.
//! - **Open**: The dependency is failing; requests are answered with a
//!   fallback until the window elapses.
//!
//! ## Usage
//!
//! ```rust
//! use adaptive_engine::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
//! use std::time::Duration;
//!
//! let config = CircuitBreakerConfig::default()
//!     .with_failure_threshold(5)
//!     .with_open_duration(Duration::from_secs(30));
//!
//! let breaker = CircuitBreaker::new(config);
//! assert!(!breaker.is_open());
//! ```

mod breaker;
mod config;
mod state;

pub use breaker::CircuitBreaker;
pub use config::CircuitBreakerConfig;
pub use state::{BreakerMetrics, CircuitState};
