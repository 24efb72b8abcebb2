//! Engine configuration.

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::core::EngineError;
use crate::engine::retry::RetryConfig;
use crate::strategy::{EvolutionConfig, Strategy, StrategyTable};

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How a healed result is reported to the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HealingPolicy {
    /// Healed results report `success = true`.
    #[default]
    MaskAsSuccess,
    /// Healed results report `success = false` and count as failed.
    ReportDegraded,
}

/// A strategy created at engine construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategySeed {
    /// Unique strategy name.
    pub name: String,
    /// Initial latency estimate in milliseconds.
    pub ema_latency_ms: f64,
}

impl StrategySeed {
    /// Creates a seed.
    pub fn new(name: impl Into<String>, ema_latency_ms: f64) -> Self {
        Self {
            name: name.into(),
            ema_latency_ms,
        }
    }
}

fn default_seeds() -> Vec<StrategySeed> {
    vec![
        StrategySeed::new("fast", 50.0),
        StrategySeed::new("safe", 300.0),
        StrategySeed::new("balanced", 150.0),
    ]
}

/// Configuration for an [`Engine`](crate::engine::Engine).
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```rust
/// use adaptive_engine::engine::EngineConfig;
///
/// let config = EngineConfig::from_json(r#"{"maxRetries": 5, "rngSeed": 7}"#).unwrap();
/// assert_eq!(config.max_retries, 5);
/// assert_eq!(config.circuit_breaker_threshold, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// Probability of picking a random strategy.
    pub exploration_rate: f64,
    /// Failed attempt cycles that open the circuit.
    pub circuit_breaker_threshold: u32,
    /// How long the circuit stays open, in milliseconds.
    pub circuit_breaker_timeout_ms: u64,
    /// Attempts per request, including the first.
    pub max_retries: u32,
    /// Wait after the first failed attempt, in milliseconds.
    pub base_backoff_ms: u64,
    /// Cap on any single backoff wait, in milliseconds.
    pub max_backoff_ms: u64,
    /// Weight of a new latency observation in the EMA.
    pub ema_alpha: f64,
    /// Pattern occurrences between learned rules.
    pub learning_threshold: u64,
    /// Processed requests between evolutions; 0 disables evolution.
    pub evolution_interval: u64,
    /// Latency factor applied to an evolved strategy's parent.
    pub evolution_speedup: f64,
    /// Ceiling on the number of strategies.
    pub max_strategies: usize,
    /// Per-attempt timeout in milliseconds; 0 disables it.
    pub attempt_timeout_ms: u64,
    /// Reported response time of a circuit-open fallback.
    pub fallback_latency_ms: f64,
    /// Reported response time of a retries-exhausted fallback.
    pub healed_latency_ms: f64,
    /// How healed results are reported.
    pub healing_policy: HealingPolicy,
    /// Seed for strategy selection; `None` seeds from entropy.
    pub rng_seed: Option<u64>,
    /// Events buffered per subscriber.
    pub event_capacity: usize,
    /// Strategies created at construction, in tie-break order.
    pub seed_strategies: Vec<StrategySeed>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            exploration_rate: 0.05,
            circuit_breaker_threshold: 3,
            circuit_breaker_timeout_ms: 5000,
            max_retries: 3,
            base_backoff_ms: 100,
            max_backoff_ms: 10_000,
            ema_alpha: 0.3,
            learning_threshold: 5,
            evolution_interval: 20,
            evolution_speedup: 0.9,
            max_strategies: 64,
            attempt_timeout_ms: 30_000,
            fallback_latency_ms: 10.0,
            healed_latency_ms: 100.0,
            healing_policy: HealingPolicy::MaskAsSuccess,
            rng_seed: None,
            event_capacity: 256,
            seed_strategies: default_seeds(),
        }
    }
}

impl EngineConfig {
    /// Creates a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EngineError::configuration(format!("invalid engine config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Sets the exploration rate.
    pub fn with_exploration_rate(mut self, rate: f64) -> Self {
        self.exploration_rate = rate;
        self
    }

    /// Sets the circuit breaker threshold.
    pub fn with_circuit_breaker_threshold(mut self, threshold: u32) -> Self {
        self.circuit_breaker_threshold = threshold;
        self
    }

    /// Sets how long the circuit stays open.
    pub fn with_circuit_breaker_timeout(mut self, timeout: Duration) -> Self {
        self.circuit_breaker_timeout_ms = duration_ms(timeout);
        self
    }

    /// Sets the number of attempts per request.
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the base and maximum backoff.
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.base_backoff_ms = duration_ms(base);
        self.max_backoff_ms = duration_ms(max);
        self
    }

    /// Sets the EMA smoothing factor.
    pub fn with_ema_alpha(mut self, alpha: f64) -> Self {
        self.ema_alpha = alpha;
        self
    }

    /// Sets the learning threshold.
    pub fn with_learning_threshold(mut self, threshold: u64) -> Self {
        self.learning_threshold = threshold;
        self
    }

    /// Sets the evolution interval.
    pub fn with_evolution_interval(mut self, interval: u64) -> Self {
        self.evolution_interval = interval;
        self
    }

    /// Sets the evolution speedup factor.
    pub fn with_evolution_speedup(mut self, speedup: f64) -> Self {
        self.evolution_speedup = speedup;
        self
    }

    /// Sets the strategy ceiling.
    pub fn with_max_strategies(mut self, max: usize) -> Self {
        self.max_strategies = max;
        self
    }

    /// Sets the per-attempt timeout; `None` disables it.
    pub fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout_ms = timeout.map(duration_ms).unwrap_or(0);
        self
    }

    /// Sets the healing policy.
    pub fn with_healing_policy(mut self, policy: HealingPolicy) -> Self {
        self.healing_policy = policy;
        self
    }

    /// Seeds strategy selection for reproducible runs.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Sets the per-subscriber event buffer.
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Replaces the seed strategies.
    pub fn with_seed_strategies(mut self, seeds: Vec<StrategySeed>) -> Self {
        self.seed_strategies = seeds;
        self
    }

    /// Checks every field.
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(0.0..=1.0).contains(&self.exploration_rate) {
            return Err(EngineError::configuration(
                "exploration rate must be between 0 and 1",
            ));
        }
        if self.max_retries == 0 {
            return Err(EngineError::configuration("max retries must be at least 1"));
        }
        if !(self.ema_alpha > 0.0 && self.ema_alpha <= 1.0) {
            return Err(EngineError::configuration(
                "EMA alpha must be in (0, 1]",
            ));
        }
        if self.learning_threshold == 0 {
            return Err(EngineError::configuration(
                "learning threshold must be at least 1",
            ));
        }
        if !(self.evolution_speedup.is_finite() && self.evolution_speedup > 0.0) {
            return Err(EngineError::configuration(
                "evolution speedup must be positive",
            ));
        }
        for (name, value) in [
            ("fallback latency", self.fallback_latency_ms),
            ("healed latency", self.healed_latency_ms),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(EngineError::configuration(format!(
                    "{name} must be a non-negative number"
                )));
            }
        }
        if self.event_capacity == 0 {
            return Err(EngineError::configuration(
                "event capacity must be at least 1",
            ));
        }
        if self.seed_strategies.is_empty() {
            return Err(EngineError::configuration(
                "at least one seed strategy is required",
            ));
        }
        if self.max_strategies < self.seed_strategies.len() {
            return Err(EngineError::configuration(format!(
                "max strategies ({}) is below the number of seed strategies ({})",
                self.max_strategies,
                self.seed_strategies.len()
            )));
        }
        for seed in &self.seed_strategies {
            if seed.name.is_empty() {
                return Err(EngineError::configuration("strategy names must not be empty"));
            }
            if !(seed.ema_latency_ms.is_finite() && seed.ema_latency_ms >= 0.0) {
                return Err(EngineError::configuration(format!(
                    "strategy '{}' needs a non-negative latency",
                    seed.name
                )));
            }
        }

        self.circuit_breaker().validate()?;
        self.strategy_table().map(|_| ())
    }

    /// Derives the circuit breaker configuration.
    pub fn circuit_breaker(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig::new()
            .with_failure_threshold(self.circuit_breaker_threshold)
            .with_open_duration(Duration::from_millis(self.circuit_breaker_timeout_ms))
    }

    /// Derives the retry configuration.
    pub fn retry(&self) -> RetryConfig {
        RetryConfig::new()
            .with_max_attempts(self.max_retries)
            .with_initial_delay(Duration::from_millis(self.base_backoff_ms))
            .with_max_delay(Duration::from_millis(self.max_backoff_ms))
            .with_backoff_multiplier(2.0)
    }

    /// Derives the evolution configuration.
    pub fn evolution(&self) -> EvolutionConfig {
        EvolutionConfig {
            interval: self.evolution_interval,
            speedup: self.evolution_speedup,
            max_strategies: self.max_strategies,
        }
    }

    /// Returns the per-attempt timeout, if enabled.
    pub fn attempt_timeout(&self) -> Option<Duration> {
        (self.attempt_timeout_ms > 0).then(|| Duration::from_millis(self.attempt_timeout_ms))
    }

    /// Builds the initial strategy table. Duplicate names are rejected.
    pub fn strategy_table(&self) -> Result<StrategyTable, EngineError> {
        StrategyTable::from_strategies(
            self.seed_strategies
                .iter()
                .map(|seed| Strategy::seed(seed.name.clone(), seed.ema_latency_ms))
                .collect(),
        )
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.exploration_rate, 0.05);
        assert_eq!(config.healing_policy, HealingPolicy::MaskAsSuccess);
        assert_eq!(config.seed_strategies.len(), 3);
        assert_eq!(config.attempt_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_derived_configs() {
        let config = EngineConfig::new()
            .with_circuit_breaker_threshold(5)
            .with_circuit_breaker_timeout(Duration::from_secs(2))
            .with_max_retries(4)
            .with_backoff(Duration::from_millis(50), Duration::from_millis(300));

        let breaker = config.circuit_breaker();
        assert_eq!(breaker.failure_threshold, 5);
        assert_eq!(breaker.open_duration, Duration::from_secs(2));

        let retry = config.retry();
        assert_eq!(retry.max_attempts, 4);
        assert_eq!(retry.delay_for_attempt(1), Duration::from_millis(50));
        assert_eq!(retry.delay_for_attempt(4), Duration::from_millis(300));
    }

    #[test]
    fn test_from_json() {
        let config = EngineConfig::from_json(
            r#"{
                "explorationRate": 0.0,
                "healingPolicy": "reportDegraded",
                "attemptTimeoutMs": 0,
                "seedStrategies": [{"name": "only", "emaLatencyMs": 20}]
            }"#,
        )
        .unwrap();

        assert_eq!(config.exploration_rate, 0.0);
        assert_eq!(config.healing_policy, HealingPolicy::ReportDegraded);
        assert_eq!(config.attempt_timeout(), None);
        assert_eq!(config.seed_strategies, vec![StrategySeed::new("only", 20.0)]);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        let err = EngineConfig::from_json(r#"{"maxRetries": "three"}"#).unwrap_err();
        assert!(err.is_configuration());

        let err = EngineConfig::from_json(r#"{"explorationRate": 1.5}"#).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_validation() {
        assert!(EngineConfig::new().with_max_retries(0).validate().is_err());
        assert!(EngineConfig::new().with_ema_alpha(0.0).validate().is_err());
        assert!(EngineConfig::new().with_learning_threshold(0).validate().is_err());
        assert!(EngineConfig::new().with_circuit_breaker_threshold(0).validate().is_err());
        assert!(EngineConfig::new().with_max_strategies(2).validate().is_err());
        assert!(EngineConfig::new().with_exploration_rate(f64::NAN).validate().is_err());
        assert!(EngineConfig::new().with_seed_strategies(vec![]).validate().is_err());

        let duplicate = EngineConfig::new().with_seed_strategies(vec![
            StrategySeed::new("a", 10.0),
            StrategySeed::new("a", 20.0),
        ]);
        assert!(duplicate.validate().is_err());
    }
}
