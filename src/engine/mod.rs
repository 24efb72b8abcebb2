//! The engine and its request pipeline.
//!
//! An [`Engine`] owns a strategy table, a circuit breaker, a pattern learner
//! and metrics for one protected dependency. Each request flows through
//! circuit check, strategy selection, retry-driven execution and learning.

mod adaptive;
mod config;
mod executor;
mod retry;

pub use adaptive::Engine;
pub use config::{EngineConfig, HealingPolicy, StrategySeed};
pub use executor::Executor;
pub use retry::{retry_with_backoff, RetryConfig, RetryOutcome};
