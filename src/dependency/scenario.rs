//! Simulated dependency with a fixed failure probability.

use crate::core::{AttemptContext, AttemptOutcome, Dependency, EngineError};

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A simulated downstream dependency.
///
/// Each attempt takes the strategy's expected latency (or the scenario's
/// own average when the strategy has no estimate yet) scaled by a uniform
/// factor in `[0.9, 1.1]` and rounded to whole milliseconds, sleeps that
/// long, then fails with probability `failure_rate`.
///
/// # Examples
///
/// ```rust
/// use adaptive_engine::dependency::Scenario;
///
/// let outage = Scenario::new("outage", 0.6).with_avg_latency_ms(80.0);
/// assert_eq!(outage.failure_rate, 0.6);
///
/// let presets = Scenario::presets();
/// assert_eq!(presets.len(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// Scenario name, used as the dependency name.
    pub name: String,
    /// Probability in `[0, 1]` that an attempt fails.
    pub failure_rate: f64,
    /// Latency used when the strategy has no estimate.
    #[serde(default = "default_avg_latency_ms")]
    pub avg_latency_ms: f64,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

fn default_avg_latency_ms() -> f64 {
    100.0
}

impl Scenario {
    /// Creates a scenario. The failure rate is clamped to `[0, 1]`.
    pub fn new(name: impl Into<String>, failure_rate: f64) -> Self {
        Self {
            name: name.into(),
            failure_rate: clamp_rate(failure_rate),
            avg_latency_ms: default_avg_latency_ms(),
            description: String::new(),
        }
    }

    /// Sets the fallback average latency.
    pub fn with_avg_latency_ms(mut self, latency_ms: f64) -> Self {
        self.avg_latency_ms = latency_ms.max(0.0);
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Standard load, 10% failures.
    pub fn normal_operations() -> Self {
        Self::new("normal-operations", 0.1).with_description("Standard load")
    }

    /// API outage, 60% failures.
    pub fn high_failure_rate() -> Self {
        Self::new("high-failure-rate", 0.6).with_description("API outages")
    }

    /// Disaster, 80% failures.
    pub fn extreme_stress() -> Self {
        Self::new("extreme-stress", 0.8).with_description("Multiple simultaneous failures")
    }

    /// Partial outage used to watch the engine adapt, 30% failures.
    pub fn recovery_test() -> Self {
        Self::new("recovery-test", 0.3).with_description("Learning and adaptation")
    }

    /// Coin-flip failures.
    pub fn chaos_test() -> Self {
        Self::new("chaos-test", 0.5).with_description("Random failures")
    }

    /// All built-in scenarios, mildest first.
    pub fn presets() -> Vec<Self> {
        vec![
            Self::normal_operations(),
            Self::recovery_test(),
            Self::chaos_test(),
            Self::high_failure_rate(),
            Self::extreme_stress(),
        ]
    }

    /// Latency an attempt will take given the strategy's estimate and a
    /// uniform draw `jitter` in `[0, 1)`.
    pub fn latency_for(&self, expected_latency_ms: f64, jitter: f64) -> f64 {
        let base = if expected_latency_ms > 0.0 {
            expected_latency_ms
        } else {
            self.avg_latency_ms
        };
        (base * (0.9 + jitter * 0.2)).round().max(0.0)
    }
}

fn clamp_rate(rate: f64) -> f64 {
    if rate.is_nan() {
        0.0
    } else {
        rate.clamp(0.0, 1.0)
    }
}

#[async_trait]
impl Dependency for Scenario {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt(&self, ctx: &AttemptContext<'_>) -> Result<AttemptOutcome, EngineError> {
        // ThreadRng is not Send; draw before the first await.
        let (jitter, roll) = {
            let mut rng = rand::thread_rng();
            (rng.gen::<f64>(), rng.gen::<f64>())
        };

        let latency_ms = self.latency_for(ctx.expected_latency_ms, jitter);
        tokio::time::sleep(Duration::from_millis(latency_ms as u64)).await;

        if roll < self.failure_rate {
            tracing::debug!(
                scenario = %self.name,
                strategy = %ctx.strategy,
                attempt = ctx.attempt,
                latency_ms,
                "Simulated attempt failed"
            );
            return Err(EngineError::attempt_failed(
                ctx.strategy,
                format!("simulated failure in scenario '{}'", self.name),
            ));
        }

        Ok(AttemptOutcome::new(latency_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Request, RequestType};

    fn context<'a>(request: &'a Request, expected: f64) -> AttemptContext<'a> {
        AttemptContext {
            request,
            strategy: "fast",
            expected_latency_ms: expected,
            attempt: 1,
        }
    }

    #[test]
    fn test_latency_bounds() {
        let scenario = Scenario::new("s", 0.0);
        assert_eq!(scenario.latency_for(50.0, 0.0), 45.0);
        assert_eq!(scenario.latency_for(50.0, 0.5), 50.0);
        assert!(scenario.latency_for(50.0, 0.999) <= 55.0);
    }

    #[test]
    fn test_latency_falls_back_to_average() {
        let scenario = Scenario::new("s", 0.0).with_avg_latency_ms(200.0);
        assert_eq!(scenario.latency_for(0.0, 0.5), 200.0);
    }

    #[test]
    fn test_failure_rate_clamped() {
        assert_eq!(Scenario::new("s", 1.7).failure_rate, 1.0);
        assert_eq!(Scenario::new("s", -0.2).failure_rate, 0.0);
        assert_eq!(Scenario::new("s", f64::NAN).failure_rate, 0.0);
    }

    #[test]
    fn test_deserialize_defaults() {
        let scenario: Scenario =
            serde_json::from_str(r#"{"name": "json", "failureRate": 0.25}"#).unwrap();
        assert_eq!(scenario.failure_rate, 0.25);
        assert_eq!(scenario.avg_latency_ms, 100.0);
        assert!(scenario.description.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reliable_scenario_succeeds() {
        let scenario = Scenario::new("reliable", 0.0);
        let request = Request::new(RequestType::ApiCall);

        let outcome = scenario.attempt(&context(&request, 50.0)).await.unwrap();
        assert!((45.0..=55.0).contains(&outcome.latency_ms));
    }

    #[tokio::test(start_paused = true)]
    async fn test_broken_scenario_fails() {
        let scenario = Scenario::new("broken", 1.0);
        let request = Request::new(RequestType::Payment);

        let err = scenario.attempt(&context(&request, 50.0)).await.unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(err.strategy(), Some("fast"));
    }
}
