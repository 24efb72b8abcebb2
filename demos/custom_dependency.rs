//! Custom dependency example: put the engine in front of your own backend.
//!
//! This example shows how to:
//! - Implement the Dependency trait for a custom backend
//! - Load an engine configuration from JSON with custom strategies
//! - Let the engine learn which strategy suits the backend
//!
//! Run with: cargo run --example custom_dependency

use adaptive_engine::prelude::*;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A replicated key-value store.
///
/// The `primary` strategy reads from the leader, which is fast but drops
/// every third call. The `replica` strategy reads from a follower, which is
/// slower but never fails.
#[derive(Debug)]
struct ReplicatedStore {
    name: String,
    latencies: HashMap<String, Duration>,
    calls: AtomicU64,
}

impl ReplicatedStore {
    /// Creates a store with no known strategies.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            latencies: HashMap::new(),
            calls: AtomicU64::new(0),
        }
    }

    /// Sets the latency of reads made with `strategy`.
    pub fn with_route(mut self, strategy: impl Into<String>, latency: Duration) -> Self {
        self.latencies.insert(strategy.into(), latency);
        self
    }
}

#[async_trait]
impl Dependency for ReplicatedStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn attempt(&self, ctx: &AttemptContext<'_>) -> Result<AttemptOutcome, EngineError> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;

        // Evolved strategies have no route of their own; they read from the
        // leader.
        let latency = self
            .latencies
            .get(ctx.strategy)
            .or_else(|| self.latencies.get("primary"))
            .copied()
            .ok_or_else(|| EngineError::connection_failed(&self.name, "no route configured"))?;

        tracing::debug!(
            dependency = self.name(),
            strategy = ctx.strategy,
            attempt = ctx.attempt,
            request_type = %ctx.request.request_type,
            "Reading from store"
        );

        tokio::time::sleep(latency).await;

        if ctx.strategy != "replica" && call % 3 == 0 {
            return Err(EngineError::attempt_failed(ctx.strategy, "leader dropped the connection"));
        }

        Ok(AttemptOutcome::new(latency.as_secs_f64() * 1000.0))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Custom Dependency Example ===\n");

    let config = EngineConfig::from_json(
        r#"{
            "explorationRate": 0.2,
            "maxRetries": 3,
            "baseBackoffMs": 5,
            "maxBackoffMs": 50,
            "learningThreshold": 10,
            "evolutionInterval": 15,
            "rngSeed": 42,
            "seedStrategies": [
                { "name": "primary", "emaLatencyMs": 20 },
                { "name": "replica", "emaLatencyMs": 60 }
            ]
        }"#,
    )?;
    let engine = Engine::new(config)?;

    let store = ReplicatedStore::new("kv-store")
        .with_route("primary", Duration::from_millis(10))
        .with_route("replica", Duration::from_millis(40));

    println!("Processing 60 reads against '{}'...\n", store.name());

    let mut healed = 0;
    for i in 0..60 {
        let kind = if i % 2 == 0 { "session" } else { "profile" };
        let request = Request::new(RequestType::new(kind));
        let result = engine.process_request(&request, &store).await?;
        if result.healed {
            healed += 1;
        }
    }

    println!("Healed results: {}", healed);

    println!("\n=== What the engine learned ===");
    for strategy in engine.strategies() {
        println!(
            "  {:<12} success rate {:>5}  ema {:>6.1} ms  ({:?})",
            strategy.name,
            strategy
                .success_rate()
                .map(|rate| format!("{:.0}%", rate * 100.0))
                .unwrap_or_else(|| "n/a".to_string()),
            strategy.ema_latency_ms,
            strategy.origin
        );
    }

    for (key, pattern) in engine.patterns() {
        println!(
            "  pattern {:<18} count {:>3}  dominant {:?}",
            key.to_string(),
            pattern.count,
            pattern.dominant_strategy()
        );
    }

    println!("\nNext pick: {}", engine.select_strategy().strategy());

    let metrics = engine.get_metrics();
    println!(
        "Metrics: {} requests, {} rules learned, {} strategies evolved",
        metrics.total_requests, metrics.learned_rules, metrics.strategies_evolved
    );

    println!("\n=== Example Complete ===");
    Ok(())
}
