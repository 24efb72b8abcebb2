//! The strategy table: an append-only arena of strategies indexed by name.

use crate::core::EngineError;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where a strategy came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyOrigin {
    /// Created at engine construction.
    Seed,
    /// Synthesized by strategy evolution.
    Evolved {
        /// Name of the strategy it was cloned from.
        parent: String,
    },
}

/// A named execution strategy and its learned performance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    /// Unique name.
    pub name: String,
    /// Successful attempts.
    pub success_count: u64,
    /// All attempts, successful or not.
    pub total_attempts: u64,
    /// Exponential moving average of observed latency in milliseconds.
    pub ema_latency_ms: f64,
    /// Where the strategy came from.
    pub origin: StrategyOrigin,
}

impl Strategy {
    /// Creates a seed strategy with a baseline latency estimate.
    pub fn seed(name: impl Into<String>, ema_latency_ms: f64) -> Self {
        Self {
            name: name.into(),
            success_count: 0,
            total_attempts: 0,
            ema_latency_ms: ema_latency_ms.max(0.0),
            origin: StrategyOrigin::Seed,
        }
    }

    /// Creates an evolved strategy derived from `parent`.
    pub fn evolved(name: impl Into<String>, parent: impl Into<String>, ema_latency_ms: f64) -> Self {
        Self {
            origin: StrategyOrigin::Evolved {
                parent: parent.into(),
            },
            ..Self::seed(name, ema_latency_ms)
        }
    }

    /// Returns the observed success rate, or `None` before any attempt.
    pub fn success_rate(&self) -> Option<f64> {
        if self.total_attempts == 0 {
            return None;
        }
        Some(self.success_count as f64 / self.total_attempts as f64)
    }

    /// Returns `true` if this strategy was produced by evolution.
    pub fn is_evolved(&self) -> bool {
        matches!(self.origin, StrategyOrigin::Evolved { .. })
    }

    /// Records a failed attempt.
    pub fn record_failure(&mut self) {
        self.total_attempts += 1;
    }

    /// Records a successful attempt and blends its latency into the EMA.
    pub fn record_success(&mut self, latency_ms: f64, alpha: f64) {
        self.total_attempts += 1;
        self.success_count += 1;
        self.ema_latency_ms = (alpha * latency_ms + (1.0 - alpha) * self.ema_latency_ms).max(0.0);
    }
}

/// Strategies in insertion order, addressable by name.
///
/// Insertion order is significant: selection and evolution break ties in
/// favour of the earlier strategy.
#[derive(Debug, Clone, Default)]
pub struct StrategyTable {
    strategies: Vec<Strategy>,
    index: HashMap<String, usize>,
}

impl StrategyTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table holding `strategies` in order.
    pub fn from_strategies(strategies: Vec<Strategy>) -> Result<Self, EngineError> {
        let mut table = Self::new();
        for strategy in strategies {
            table.insert(strategy)?;
        }
        Ok(table)
    }

    /// Appends a strategy. Names must be unique.
    pub fn insert(&mut self, strategy: Strategy) -> Result<(), EngineError> {
        if self.index.contains_key(&strategy.name) {
            return Err(EngineError::configuration(format!(
                "duplicate strategy name '{}'",
                strategy.name
            )));
        }
        self.index.insert(strategy.name.clone(), self.strategies.len());
        self.strategies.push(strategy);
        Ok(())
    }

    /// Looks up a strategy by name.
    pub fn get(&self, name: &str) -> Option<&Strategy> {
        self.index.get(name).map(|&i| &self.strategies[i])
    }

    /// Looks up a strategy by name for mutation.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Strategy> {
        match self.index.get(name) {
            Some(&i) => self.strategies.get_mut(i),
            None => None,
        }
    }

    /// Returns `true` if a strategy with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Number of strategies.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Returns `true` if the table holds no strategies.
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Iterates strategies in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Strategy> {
        self.strategies.iter()
    }

    /// Returns the strategy at `position` in insertion order.
    pub fn get_index(&self, position: usize) -> Option<&Strategy> {
        self.strategies.get(position)
    }

    /// Removes the least-used evolved strategy (fewest attempts, oldest on
    /// ties) and returns it. Seeds are never evicted.
    pub fn evict_least_used_evolved(&mut self) -> Option<Strategy> {
        let mut victim: Option<usize> = None;
        for (i, strategy) in self.strategies.iter().enumerate() {
            if !strategy.is_evolved() {
                continue;
            }
            match victim {
                Some(v) if self.strategies[v].total_attempts <= strategy.total_attempts => {}
                _ => victim = Some(i),
            }
        }

        let position = victim?;
        let removed = self.strategies.remove(position);
        self.reindex();
        Some(removed)
    }

    /// Returns a copy of every strategy in insertion order.
    pub fn snapshot(&self) -> Vec<Strategy> {
        self.strategies.clone()
    }

    fn reindex(&mut self) {
        self.index = self
            .strategies
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();
    }
}
