//! Single-attempt execution with a per-attempt timeout.

use crate::core::{AttemptContext, AttemptOutcome, Dependency, EngineError};

use std::time::Duration;

/// Runs one attempt against a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Executor {
    attempt_timeout: Option<Duration>,
}

impl Executor {
    /// Creates an executor. `None` lets attempts run unbounded.
    pub fn new(attempt_timeout: Option<Duration>) -> Self {
        Self { attempt_timeout }
    }

    /// Returns the per-attempt timeout.
    pub fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout
    }

    /// Executes one attempt.
    ///
    /// An attempt still running after the timeout fails with
    /// `EngineError::Timeout`. Reported latencies that are negative or not
    /// finite are clamped to 0 so they cannot poison the latency model.
    pub async fn execute<D>(
        &self,
        dependency: &D,
        ctx: &AttemptContext<'_>,
    ) -> Result<AttemptOutcome, EngineError>
    where
        D: Dependency + ?Sized,
    {
        let result = match self.attempt_timeout {
            Some(limit) => match tokio::time::timeout(limit, dependency.attempt(ctx)).await {
                Ok(result) => result,
                Err(_) => Err(EngineError::timeout(ctx.strategy, limit)),
            },
            None => dependency.attempt(ctx).await,
        };

        result.map(|outcome| {
            if outcome.latency_ms.is_finite() && outcome.latency_ms >= 0.0 {
                outcome
            } else {
                tracing::warn!(
                    dependency = dependency.name(),
                    strategy = %ctx.strategy,
                    latency_ms = outcome.latency_ms,
                    "Dependency reported an invalid latency"
                );
                AttemptOutcome::new(0.0)
            }
        })
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(Some(Duration::from_secs(30)))
    }
}
