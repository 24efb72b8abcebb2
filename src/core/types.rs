//! Core types used throughout the adaptive engine.
//!
//! This module defines the request model, the per-request result returned
//! to callers, and the small value types that flow between the executor,
//! the retry controller and the engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Name reported as the strategy of a healed (fallback) result.
pub const FALLBACK_STRATEGY: &str = "fallback";

/// The kind of work a request represents.
///
/// The three named kinds cover the common cases; `Other` keeps the set open
/// for hosts with their own request taxonomy. On the wire a request type is
/// its plain name (`"payment"`, `"search"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RequestType {
    /// A call to an external API.
    ApiCall,
    /// A database query.
    Database,
    /// A payment transaction.
    Payment,
    /// Any other request kind, identified by name.
    Other(String),
}

impl RequestType {
    /// Creates a request type from its name, mapping known names to their
    /// named variants.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self::from(name.as_ref())
    }

    /// Returns the canonical form: an `Other` carrying a known name becomes
    /// that named variant.
    pub fn normalized(&self) -> Self {
        match self {
            Self::Other(name) => Self::from(name.as_str()),
            named => named.clone(),
        }
    }

    /// Returns the stable string form used in pattern keys and logs.
    pub fn as_str(&self) -> &str {
        match self {
            Self::ApiCall => "api_call",
            Self::Database => "database",
            Self::Payment => "payment",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for RequestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for RequestType {
    fn from(value: &str) -> Self {
        match value {
            "api_call" => Self::ApiCall,
            "database" => Self::Database,
            "payment" => Self::Payment,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for RequestType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "api_call" | "database" | "payment" => Self::from(value.as_str()),
            _ => Self::Other(value),
        }
    }
}

impl From<RequestType> for String {
    fn from(value: RequestType) -> Self {
        match value {
            RequestType::Other(name) => name,
            named => named.as_str().to_string(),
        }
    }
}

/// A request submitted to the engine.
///
/// Requests are supplied by the caller and never stored by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Caller-visible identifier.
    pub id: String,

    /// The kind of work requested.
    #[serde(rename = "type")]
    pub request_type: RequestType,
}

impl Request {
    /// Creates a request with a fresh UUID v4 identifier.
    pub fn new(request_type: RequestType) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            request_type,
        }
    }

    /// Creates a request with an explicit identifier.
    pub fn with_id(id: impl Into<String>, request_type: RequestType) -> Self {
        Self {
            id: id.into(),
            request_type,
        }
    }
}

/// Outcome of an attempt cycle as seen by the pattern learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    /// At least one attempt succeeded.
    Success,
    /// Every attempt failed.
    Fail,
}

impl Outcome {
    /// Maps a success flag to an outcome.
    pub fn from_success(success: bool) -> Self {
        if success {
            Self::Success
        } else {
            Self::Fail
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

/// Why a result was healed instead of served by a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealReason {
    /// The circuit breaker was open; the dependency was not called.
    CircuitOpen,
    /// Every retry failed.
    RetriesExhausted,
}

/// The result of `process_request`.
///
/// `healed` is always truthful: a healed result never came from a
/// successful downstream call, whatever `success` says.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResult {
    /// Outward success flag, shaped by the engine's healing policy.
    pub success: bool,

    /// Whether the result is a fallback rather than a real response.
    pub healed: bool,

    /// Strategy that served the request, or `"fallback"` when healed.
    pub strategy: String,

    /// Number of attempts made against the dependency.
    pub attempts: u32,

    /// Reported response time in milliseconds.
    pub response_time_ms: f64,

    /// Why the result was healed, if it was.
    pub heal_reason: Option<HealReason>,
}

impl ProcessResult {
    /// Creates a result for a request served by `strategy`.
    pub fn served(strategy: impl Into<String>, attempts: u32, response_time_ms: f64) -> Self {
        Self {
            success: true,
            healed: false,
            strategy: strategy.into(),
            attempts,
            response_time_ms,
            heal_reason: None,
        }
    }

    /// Creates a healed fallback result.
    pub fn healed(
        success: bool,
        reason: HealReason,
        attempts: u32,
        response_time_ms: f64,
    ) -> Self {
        Self {
            success,
            healed: true,
            strategy: FALLBACK_STRATEGY.to_string(),
            attempts,
            response_time_ms,
            heal_reason: Some(reason),
        }
    }

    /// Returns `true` if a strategy actually served the request.
    pub fn is_served(&self) -> bool {
        !self.healed
    }
}

/// What a dependency reports for one successful attempt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AttemptOutcome {
    /// Observed latency of the attempt in milliseconds.
    pub latency_ms: f64,
}

impl AttemptOutcome {
    /// Creates an outcome with the given latency.
    pub fn new(latency_ms: f64) -> Self {
        Self { latency_ms }
    }
}

/// Summary of a retry-driven execution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrySummary {
    /// Whether any attempt succeeded.
    pub success: bool,
    /// Attempts made, including the successful one.
    pub attempts: u32,
    /// Latency of the successful attempt; `0.0` on exhaustion.
    pub latency_ms: f64,
}
