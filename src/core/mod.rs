//! Core types and traits for the adaptive engine.
//!
//! - [`types`] - Requests, results and attempt summaries
//! - [`traits`] - The `Dependency` trait
//! - [`error`] - Structured error types

pub mod error;
pub mod traits;
pub mod types;

pub use error::{EngineError, EngineResult};
pub use traits::{ArcDependency, AttemptContext, Dependency};
pub use types::{
    AttemptOutcome, HealReason, Outcome, ProcessResult, Request, RequestType, RetrySummary,
    FALLBACK_STRATEGY,
};
