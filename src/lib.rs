//! # Adaptive Engine
//!
//! An adaptive, self-healing request execution engine with circuit breaking,
//! retries, ε-greedy strategy selection and online learning.
//!
//! ## Overview
//!
//! The engine sits in front of one downstream dependency and lets you:
//!
//! - Route requests through competing execution strategies
//! - Learn which strategy performs best from an EMA latency model
//! - Retry transient failures with exponential backoff
//! - Stop calling a failing dependency with a time-windowed circuit breaker
//! - Answer with a healed fallback instead of an error
//! - Mine (request type, outcome) patterns into learned rules
//! - Evolve faster strategy variants from the most reliable one
//! - Observe everything through `tracing`, a broadcast event stream and
//!   Prometheus-format metrics
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use adaptive_engine::{Engine, EngineConfig, Request, RequestType};
//! use adaptive_engine::dependency::Scenario;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Engine::new(EngineConfig::default().with_max_retries(5))?;
//!     let outage = Scenario::high_failure_rate();
//!
//!     let result = engine
//!         .process_request(&Request::new(RequestType::Payment), &outage)
//!         .await?;
//!
//!     if result.healed {
//!         println!("served by fallback: {:?}", result.heal_reason);
//!     }
//!
//!     println!("{}", engine.get_metrics().render_prometheus());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Core**: Requests, results, the `Dependency` trait and errors
//! - **Strategy**: The strategy table, ε-greedy selection and evolution
//! - **Circuit Breaker**: Timestamp-based open/closed gate
//! - **Learning**: Pattern mining and learned rules
//! - **Metrics**: Counters, health score and latency histogram
//! - **Events**: Structured log records and the broadcast stream
//! - **Dependency**: Simulated and mock dependencies
//! - **Engine**: Request orchestration

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod circuit_breaker;
pub mod core;
pub mod dependency;
pub mod engine;
pub mod events;
pub mod learning;
pub mod metrics;
pub mod strategy;

// Re-export commonly used types at the crate root
pub use crate::core::{
    ArcDependency, AttemptContext, AttemptOutcome, Dependency, EngineError, EngineResult,
    HealReason, ProcessResult, Request, RequestType,
};

pub use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use crate::engine::{Engine, EngineConfig, HealingPolicy};
pub use crate::events::{EngineEvent, LogLevel, LogRecord};
pub use crate::learning::LearnedRule;
pub use crate::metrics::Metrics;
pub use crate::strategy::{Selection, Strategy};

/// Prelude module for convenient imports.
///
/// ```rust
/// use adaptive_engine::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{
        AttemptContext, AttemptOutcome, Dependency, EngineError, HealReason, ProcessResult,
        Request, RequestType,
    };
    pub use crate::dependency::{MockDependency, Scenario};
    pub use crate::engine::{Engine, EngineConfig, HealingPolicy};
    pub use crate::events::EngineEvent;
    pub use crate::metrics::Metrics;
}
