//! Execution strategies: the table, ε-greedy selection and evolution.
//!
//! - [`table`] - Append-only arena of strategies with EMA latency tracking
//! - [`selector`] - ε-greedy selection by weighted success/speed score
//! - [`evolution`] - Periodic cloning of the most reliable strategy

pub mod evolution;
pub mod selector;
pub mod table;

pub use evolution::{EvolutionConfig, EvolutionSkipped, EvolvedStrategy, StrategyEvolver};
pub use selector::{score, Selection, StrategySelector, DEFAULT_STRATEGY};
pub use table::{Strategy, StrategyOrigin, StrategyTable};
