//! Pattern learning.
//!
//! The learner records which strategy served each (request type, outcome)
//! pair and periodically surfaces a learned rule naming the dominant
//! strategy for a pattern. Rules are advisory: they are reported through
//! metrics and events and never change how requests are processed.

mod patterns;

pub use patterns::{LearnedRule, Pattern, PatternKey, PatternLearner};
