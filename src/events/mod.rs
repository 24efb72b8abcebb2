//! Structured log records and the engine event stream.
//!
//! Events are emitted through `tracing` (target `adaptive_engine::events`)
//! so any subscriber can capture them, and broadcast over a
//! `tokio::sync::broadcast` channel for in-process consumers such as a UI
//! bridge. Emission is fire-and-forget.

mod emitter;
mod record;

pub use emitter::EventEmitter;
pub use record::{EngineEvent, LogLevel, LogRecord};
