//! `Dependency` implementations.
//!
//! - [`scenario`] - Simulated dependency with a fixed failure probability
//! - [`mock`] - Scriptable, deterministic dependency for tests
//!
//! ## Implementing a Custom Dependency
//!
//! Anything the engine should protect implements the `Dependency` trait:
//!
//! ```rust,ignore
//! use adaptive_engine::core::{AttemptContext, AttemptOutcome, Dependency, EngineError};
//! use async_trait::async_trait;
//!
//! #[derive(Debug)]
//! pub struct InventoryService;
//!
//! #[async_trait]
//! impl Dependency for InventoryService {
//!     fn name(&self) -> &str {
//!         "inventory"
//!     }
//!
//!     async fn attempt(&self, ctx: &AttemptContext<'_>) -> Result<AttemptOutcome, EngineError> {
//!         // Call the service, measure latency
//!         todo!()
//!     }
//! }
//! ```

pub mod mock;
pub mod scenario;

pub use mock::MockDependency;
pub use scenario::Scenario;
