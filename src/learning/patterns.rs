//! Pattern mining over (request type, outcome) occurrences.

use crate::core::{Outcome, RequestType};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Identifies a pattern: a request type together with an outcome.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PatternKey {
    /// The request type.
    pub request_type: RequestType,
    /// Whether the attempt cycle succeeded.
    pub outcome: Outcome,
}

impl PatternKey {
    /// Creates a key. The request type is normalized so that every spelling
    /// of a known kind maps to one key.
    pub fn new(request_type: RequestType, outcome: Outcome) -> Self {
        Self {
            request_type: request_type.normalized(),
            outcome,
        }
    }
}

impl fmt::Display for PatternKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.request_type, self.outcome)
    }
}

/// Occurrence statistics for one pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    /// Times the pattern was observed.
    pub count: u64,
    /// Times each strategy was involved.
    pub strategy_frequency: BTreeMap<String, u64>,
}

impl Pattern {
    /// Returns the most frequent strategy; ties go to the smallest name.
    pub fn dominant_strategy(&self) -> Option<&str> {
        let mut best: Option<(&str, u64)> = None;
        for (name, &count) in &self.strategy_frequency {
            match best {
                Some((_, top)) if count <= top => {}
                _ => best = Some((name, count)),
            }
        }
        best.map(|(name, _)| name)
    }
}

/// An advisory association between a pattern and its dominant strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnedRule {
    /// Rendered pattern key, e.g. `api_call|success`.
    pub pattern: String,
    /// Strategy most often involved in the pattern.
    pub dominant_strategy: String,
    /// Pattern count when the rule was learned.
    pub occurrences: u64,
    /// When the rule was learned.
    pub learned_at: DateTime<Utc>,
}

/// Records pattern occurrences and learns a rule every `threshold`
/// occurrences of a pattern.
#[derive(Debug, Clone)]
pub struct PatternLearner {
    threshold: u64,
    patterns: HashMap<PatternKey, Pattern>,
    latest_rules: HashMap<PatternKey, LearnedRule>,
    rules_learned: u64,
}

impl PatternLearner {
    /// Creates a learner. A zero threshold is treated as 1.
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold: threshold.max(1),
            patterns: HashMap::new(),
            latest_rules: HashMap::new(),
            rules_learned: 0,
        }
    }

    /// Records one occurrence and returns the rule learned by it, if any.
    pub fn learn(
        &mut self,
        request_type: &RequestType,
        strategy: &str,
        success: bool,
    ) -> Option<LearnedRule> {
        let key = PatternKey::new(request_type.clone(), Outcome::from_success(success));
        let pattern = self.patterns.entry(key.clone()).or_default();
        pattern.count += 1;
        *pattern
            .strategy_frequency
            .entry(strategy.to_string())
            .or_insert(0) += 1;

        if pattern.count % self.threshold != 0 {
            return None;
        }

        let rule = LearnedRule {
            pattern: key.to_string(),
            dominant_strategy: pattern.dominant_strategy().unwrap_or(strategy).to_string(),
            occurrences: pattern.count,
            learned_at: Utc::now(),
        };
        self.rules_learned += 1;
        self.latest_rules.insert(key, rule.clone());
        Some(rule)
    }

    /// Total rules learned so far.
    pub fn rules_learned(&self) -> u64 {
        self.rules_learned
    }

    /// Returns the pattern for `key`, if observed.
    pub fn pattern(&self, key: &PatternKey) -> Option<&Pattern> {
        let key = PatternKey::new(key.request_type.clone(), key.outcome);
        self.patterns.get(&key)
    }

    /// Returns every observed pattern, sorted by key.
    pub fn patterns(&self) -> Vec<(PatternKey, Pattern)> {
        let mut all: Vec<_> = self
            .patterns
            .iter()
            .map(|(k, p)| (k.clone(), p.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Returns the most recent rule for each pattern, sorted by pattern.
    pub fn learned_rules(&self) -> Vec<LearnedRule> {
        let mut rules: Vec<_> = self.latest_rules.values().cloned().collect();
        rules.sort_by(|a, b| a.pattern.cmp(&b.pattern));
        rules
    }
}

impl Default for PatternLearner {
    fn default() -> Self {
        Self::new(5)
    }
}
