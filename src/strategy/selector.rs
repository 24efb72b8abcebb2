//! ε-greedy strategy selection.

use crate::strategy::table::{Strategy, StrategyTable};

use rand::Rng;

/// Strategy name returned when the table is empty.
pub const DEFAULT_STRATEGY: &str = "balanced";

/// Weight of the success rate in a strategy's score.
pub const SUCCESS_WEIGHT: f64 = 0.7;

/// Weight of the speed score in a strategy's score.
pub const SPEED_WEIGHT: f64 = 0.3;

/// Success rate assumed for a strategy that has never been attempted.
pub const PRIOR_SUCCESS_RATE: f64 = 0.5;

/// How a strategy was chosen.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Highest-scoring strategy.
    Exploit {
        /// Chosen strategy.
        strategy: String,
        /// Its score.
        score: f64,
    },
    /// Uniformly random strategy.
    Explore {
        /// Chosen strategy.
        strategy: String,
    },
}

impl Selection {
    /// Returns the chosen strategy name.
    pub fn strategy(&self) -> &str {
        match self {
            Self::Exploit { strategy, .. } | Self::Explore { strategy } => strategy,
        }
    }

    /// Consumes the selection, returning the strategy name.
    pub fn into_strategy(self) -> String {
        match self {
            Self::Exploit { strategy, .. } | Self::Explore { strategy } => strategy,
        }
    }

    /// Returns `true` for an exploration pick.
    pub fn is_exploration(&self) -> bool {
        matches!(self, Self::Explore { .. })
    }
}

/// Scores a strategy: `0.7 * success_rate + 0.3 / (1 + ema_latency_ms)`.
///
/// The speed term lies in `(0, 1]`, so a very fast strategy cannot outweigh
/// a reliable one.
pub fn score(strategy: &Strategy) -> f64 {
    let success_rate = strategy.success_rate().unwrap_or(PRIOR_SUCCESS_RATE);
    let speed_score = 1.0 / (1.0 + strategy.ema_latency_ms);
    SUCCESS_WEIGHT * success_rate + SPEED_WEIGHT * speed_score
}

/// ε-greedy selector over a strategy table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategySelector {
    exploration_rate: f64,
}

impl StrategySelector {
    /// Creates a selector exploring with probability `exploration_rate`.
    pub fn new(exploration_rate: f64) -> Self {
        Self {
            exploration_rate: exploration_rate.clamp(0.0, 1.0),
        }
    }

    /// Returns the exploration rate.
    pub fn exploration_rate(&self) -> f64 {
        self.exploration_rate
    }

    /// Picks a strategy from `table`.
    pub fn select<R: Rng + ?Sized>(&self, table: &StrategyTable, rng: &mut R) -> Selection {
        if !table.is_empty() && rng.gen::<f64>() < self.exploration_rate {
            let position = rng.gen_range(0..table.len());
            if let Some(strategy) = table.get_index(position) {
                return Selection::Explore {
                    strategy: strategy.name.clone(),
                };
            }
        }

        match best_by_score(table) {
            Some((strategy, score)) => Selection::Exploit {
                strategy: strategy.name.clone(),
                score,
            },
            None => Selection::Exploit {
                strategy: DEFAULT_STRATEGY.to_string(),
                score: 0.0,
            },
        }
    }
}

impl Default for StrategySelector {
    fn default() -> Self {
        Self::new(0.05)
    }
}

/// Returns the highest-scoring strategy; the first one wins ties.
pub fn best_by_score(table: &StrategyTable) -> Option<(&Strategy, f64)> {
    let mut best: Option<(&Strategy, f64)> = None;
    for strategy in table.iter() {
        let candidate = score(strategy);
        match best {
            Some((_, top)) if candidate <= top => {}
            _ => best = Some((strategy, candidate)),
        }
    }
    best
}
