//! Engine metrics: counters, health score and latency histogram.

mod collector;
mod histogram;

pub use collector::{Metrics, MetricsCollector};
pub use histogram::{LatencyHistogram, LATENCY_BUCKETS_MS};
