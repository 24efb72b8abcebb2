//! Event and log record types broadcast by the engine.

use crate::learning::LearnedRule;
use crate::metrics::Metrics;
use crate::strategy::EvolvedStrategy;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Severity of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Normal operation.
    Info,
    /// Degraded but handled.
    Warn,
    /// Failure.
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A structured log record.
///
/// Extra fields are flattened next to `level`, `message` and `timestampMs`
/// when serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Severity.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    /// Additional structured fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl LogRecord {
    /// Creates a record stamped with the current time.
    ///
    /// An object `fields` value is used as-is; `null` means no fields; any
    /// other value is stored under the `value` key.
    pub fn new(level: LogLevel, message: impl Into<String>, fields: Value) -> Self {
        let fields = match fields {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                map
            }
        };

        Self {
            level,
            message: message.into(),
            timestamp_ms: Utc::now().timestamp_millis(),
            fields,
        }
    }
}

/// An event published on the engine's event stream.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A structured log record.
    Log(LogRecord),
    /// Metrics after a request completed.
    MetricsUpdate(Metrics),
    /// A pattern crossed a learning threshold.
    RuleLearned(LearnedRule),
    /// A new strategy was evolved.
    StrategyEvolved(EvolvedStrategy),
    /// The circuit breaker opened.
    CircuitOpened {
        /// Consecutive failed cycles that opened it.
        failure_count: u32,
        /// How long the circuit stays open, in milliseconds.
        open_for_ms: u64,
    },
    /// The circuit breaker closed after recorded failures.
    CircuitClosed,
}

impl EngineEvent {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Log(_) => "log",
            Self::MetricsUpdate(_) => "metrics_update",
            Self::RuleLearned(_) => "rule_learned",
            Self::StrategyEvolved(_) => "strategy_evolved",
            Self::CircuitOpened { .. } => "circuit_opened",
            Self::CircuitClosed => "circuit_closed",
        }
    }
}
