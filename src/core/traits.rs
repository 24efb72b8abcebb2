//! Core traits for the adaptive engine.
//!
//! This module defines the `Dependency` trait: the contract the engine
//! requires from whatever it protects. The simulated `Scenario` and the
//! test `MockDependency` implement it, and so does any production adapter.

use crate::core::error::EngineError;
use crate::core::types::{AttemptOutcome, Request};

use async_trait::async_trait;
use std::fmt::Debug;

/// Everything a dependency is told about one attempt.
#[derive(Debug, Clone, Copy)]
pub struct AttemptContext<'a> {
    /// The request being processed.
    pub request: &'a Request,
    /// Strategy chosen for this request.
    pub strategy: &'a str,
    /// The strategy's current EMA latency estimate in milliseconds.
    pub expected_latency_ms: f64,
    /// Attempt number, starting at 1.
    pub attempt: u32,
}

/// A downstream dependency the engine executes attempts against.
///
/// # Implementation Notes
///
/// - Implementations must be `Send + Sync` so one engine can drive them
///   from concurrent requests.
/// - Return `Ok` with the observed latency on success. Return one of the
///   recoverable `EngineError` variants (`AttemptFailed`, `Timeout`,
///   `ConnectionFailed`, `DependencyUnavailable`) on failure; the engine
///   retries and, when retries run out, heals the request.
/// - Implementations should never panic.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use adaptive_engine::core::{AttemptContext, AttemptOutcome, Dependency, EngineError};
/// use async_trait::async_trait;
/// use std::time::Instant;
///
/// #[derive(Debug)]
/// struct PaymentsApi;
///
/// #[async_trait]
/// impl Dependency for PaymentsApi {
///     fn name(&self) -> &str {
///         "payments-api"
///     }
///
///     async fn attempt(&self, ctx: &AttemptContext<'_>) -> Result<AttemptOutcome, EngineError> {
///         let started = Instant::now();
///         // Issue the real call here...
///         Ok(AttemptOutcome::new(started.elapsed().as_secs_f64() * 1000.0))
///     }
/// }
/// ```
#[async_trait]
pub trait Dependency: Send + Sync + Debug {
    /// Returns a stable, human-readable name for logs.
    fn name(&self) -> &str;

    /// Performs one attempt.
    async fn attempt(&self, ctx: &AttemptContext<'_>) -> Result<AttemptOutcome, EngineError>;
}

/// An arc-wrapped dependency for shared ownership.
pub type ArcDependency = std::sync::Arc<dyn Dependency>;

#[async_trait]
impl<D: Dependency + ?Sized> Dependency for std::sync::Arc<D> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn attempt(&self, ctx: &AttemptContext<'_>) -> Result<AttemptOutcome, EngineError> {
        (**self).attempt(ctx).await
    }
}
