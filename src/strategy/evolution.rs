//! Strategy evolution: periodically clone the most reliable strategy into a
//! faster variant.

use crate::strategy::table::{Strategy, StrategyTable};

use serde::{Deserialize, Serialize};

/// Prefix of evolved strategy names.
pub const EVOLVED_PREFIX: &str = "evolved-";

/// Configuration for strategy evolution.
#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionConfig {
    /// Evolve after every `interval` processed requests.
    pub interval: u64,
    /// Latency factor applied to the parent's EMA (0.9 = 10% faster).
    pub speedup: f64,
    /// Ceiling on the number of strategies in the table.
    pub max_strategies: usize,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            interval: 20,
            speedup: 0.9,
            max_strategies: 64,
        }
    }
}

/// What one evolution step did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolvedStrategy {
    /// Name of the new strategy.
    pub name: String,
    /// Strategy it was cloned from.
    pub parent: String,
    /// Initial EMA latency of the new strategy.
    pub ema_latency_ms: f64,
    /// Strategy evicted to stay under the ceiling, if any.
    pub evicted: Option<String>,
}

/// Why an evolution step produced nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvolutionSkipped {
    /// The table is empty.
    NoParent,
    /// The table is full and holds no evictable strategy.
    TableFull {
        /// Current number of strategies.
        size: usize,
    },
}

/// Drives strategy evolution and counts evolved strategies.
#[derive(Debug, Clone)]
pub struct StrategyEvolver {
    config: EvolutionConfig,
    evolved_count: u64,
}

impl StrategyEvolver {
    /// Creates an evolver.
    pub fn new(config: EvolutionConfig) -> Self {
        Self {
            config,
            evolved_count: 0,
        }
    }

    /// Number of strategies evolved so far.
    pub fn evolved_count(&self) -> u64 {
        self.evolved_count
    }

    /// Returns `true` if the `total_requests`-th request should trigger
    /// evolution.
    pub fn is_due(&self, total_requests: u64) -> bool {
        self.config.interval > 0 && total_requests > 0 && total_requests % self.config.interval == 0
    }

    /// Clones the strategy with the highest success rate into a faster
    /// variant and appends it to `table`.
    pub fn evolve(&mut self, table: &mut StrategyTable) -> Result<EvolvedStrategy, EvolutionSkipped> {
        let (parent, parent_latency) = match most_reliable(table) {
            Some(best) => (best.name.clone(), best.ema_latency_ms),
            None => return Err(EvolutionSkipped::NoParent),
        };

        let mut evicted = None;
        if table.len() >= self.config.max_strategies {
            match table.evict_least_used_evolved() {
                Some(victim) => evicted = Some(victim.name),
                None => return Err(EvolutionSkipped::TableFull { size: table.len() }),
            }
        }

        self.evolved_count += 1;
        let mut name = format!("{EVOLVED_PREFIX}{}", self.evolved_count);
        while table.contains(&name) {
            self.evolved_count += 1;
            name = format!("{EVOLVED_PREFIX}{}", self.evolved_count);
        }

        let ema_latency_ms = parent_latency * self.config.speedup;
        let strategy = Strategy::evolved(name.clone(), parent.clone(), ema_latency_ms);
        table
            .insert(strategy)
            .map_err(|_| EvolutionSkipped::TableFull { size: table.len() })?;

        Ok(EvolvedStrategy {
            name,
            parent,
            ema_latency_ms,
            evicted,
        })
    }
}

impl Default for StrategyEvolver {
    fn default() -> Self {
        Self::new(EvolutionConfig::default())
    }
}

/// Returns the strategy with the highest success rate (0 when never
/// attempted); the first one wins ties.
pub fn most_reliable(table: &StrategyTable) -> Option<&Strategy> {
    let mut best: Option<(&Strategy, f64)> = None;
    for strategy in table.iter() {
        let rate = strategy.success_rate().unwrap_or(0.0);
        match best {
            Some((_, top)) if rate <= top => {}
            _ => best = Some((strategy, rate)),
        }
    }
    best.map(|(strategy, _)| strategy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> StrategyTable {
        StrategyTable::from_strategies(vec![
            Strategy::seed("fast", 50.0),
            Strategy::seed("safe", 300.0),
            Strategy::seed("balanced", 150.0),
        ])
        .unwrap()
    }

    #[test]
    fn test_is_due() {
        let evolver = StrategyEvolver::default();
        assert!(!evolver.is_due(0));
        assert!(!evolver.is_due(19));
        assert!(evolver.is_due(20));
        assert!(evolver.is_due(40));
    }

    #[test]
    fn test_evolves_from_most_reliable() {
        let mut table = seeded();
        table.get_mut("fast").unwrap().record_failure();
        table.get_mut("safe").unwrap().record_success(200.0, 0.5);

        let mut evolver = StrategyEvolver::default();
        let evolved = evolver.evolve(&mut table).unwrap();

        assert_eq!(evolved.name, "evolved-1");
        assert_eq!(evolved.parent, "safe");
        // safe's EMA is 0.5 * 200 + 0.5 * 300 = 250
        assert!((evolved.ema_latency_ms - 225.0).abs() < 1e-9);

        let strategy = table.get("evolved-1").unwrap();
        assert_eq!(strategy.total_attempts, 0);
        assert_eq!(strategy.success_count, 0);
        assert!(strategy.is_evolved());
        assert_eq!(evolver.evolved_count(), 1);
    }

    #[test]
    fn test_untried_table_evolves_from_first() {
        let mut table = seeded();
        let mut evolver = StrategyEvolver::default();
        let evolved = evolver.evolve(&mut table).unwrap();
        assert_eq!(evolved.parent, "fast");
        assert!((evolved.ema_latency_ms - 45.0).abs() < 1e-9);
    }

    #[test]
    fn test_names_stay_unique() {
        let mut table = seeded();
        table.insert(Strategy::seed("evolved-1", 10.0)).unwrap();

        let mut evolver = StrategyEvolver::default();
        let evolved = evolver.evolve(&mut table).unwrap();
        assert_eq!(evolved.name, "evolved-2");
    }

    #[test]
    fn test_ceiling_evicts_evolved() {
        let mut table = seeded();
        let mut evolver = StrategyEvolver::new(EvolutionConfig {
            max_strategies: 4,
            ..EvolutionConfig::default()
        });

        let first = evolver.evolve(&mut table).unwrap();
        assert!(first.evicted.is_none());
        assert_eq!(table.len(), 4);

        let second = evolver.evolve(&mut table).unwrap();
        assert_eq!(second.evicted.as_deref(), Some("evolved-1"));
        assert_eq!(table.len(), 4);
        assert!(table.contains("evolved-2"));
    }

    #[test]
    fn test_ceiling_without_evictable_skips() {
        let mut table = seeded();
        let mut evolver = StrategyEvolver::new(EvolutionConfig {
            max_strategies: 3,
            ..EvolutionConfig::default()
        });

        assert_eq!(
            evolver.evolve(&mut table),
            Err(EvolutionSkipped::TableFull { size: 3 })
        );
        assert_eq!(evolver.evolved_count(), 0);
    }

    #[test]
    fn test_empty_table_has_no_parent() {
        let mut evolver = StrategyEvolver::default();
        assert_eq!(
            evolver.evolve(&mut StrategyTable::new()),
            Err(EvolutionSkipped::NoParent)
        );
    }
}
