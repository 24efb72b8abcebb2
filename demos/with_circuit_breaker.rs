//! Circuit breaker example: watch the engine heal through an outage.
//!
//! This example shows how to:
//! - Configure the failure threshold and open window
//! - Follow circuit events on the event stream
//! - See requests healed while the circuit is open
//! - Recover once the dependency comes back
//!
//! Run with: cargo run --example with_circuit_breaker

use adaptive_engine::prelude::*;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    println!("=== Circuit Breaker Example ===\n");

    let config = EngineConfig::new()
        .with_max_retries(2)
        .with_backoff(Duration::from_millis(10), Duration::from_millis(50))
        .with_circuit_breaker_threshold(3)
        .with_circuit_breaker_timeout(Duration::from_secs(2));

    println!("Circuit Breaker Configuration:");
    println!("  Failure threshold: {}", config.circuit_breaker_threshold);
    println!("  Open for: {} ms", config.circuit_breaker_timeout_ms);
    println!();

    let engine = Engine::new(config)?;
    let mut events = engine.subscribe()?;

    // Print circuit transitions as they happen.
    let watcher = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(EngineEvent::CircuitOpened {
                    failure_count,
                    open_for_ms,
                }) => println!(
                    "  [event] circuit opened after {} failures, open for {} ms",
                    failure_count, open_for_ms
                ),
                Ok(EngineEvent::CircuitClosed) => println!("  [event] circuit closed"),
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    });

    let dependency = MockDependency::new()
        .with_name("payments-api")
        .with_latency(Duration::from_millis(5));

    println!("Dependency goes down...\n");
    dependency.make_unavailable();

    for i in 1..=6 {
        let request = Request::new(RequestType::Payment);
        let result = engine.process_request(&request, &dependency).await?;

        println!(
            "Request #{}: healed={} reason={:?} circuit_open={}",
            i,
            result.healed,
            result.heal_reason,
            engine.circuit_state().is_open()
        );
    }

    let breaker = engine.circuit_metrics();
    println!(
        "\nBreaker metrics: {} failures, {} rejected, opened {} time(s)",
        breaker.failures, breaker.rejected_requests, breaker.times_opened
    );
    println!("Dependency calls so far: {}", dependency.call_count());

    println!("\nDependency recovers; waiting for the open window to pass...");
    dependency.make_available();
    tokio::time::sleep(Duration::from_millis(2100)).await;

    for i in 1..=3 {
        let request = Request::new(RequestType::Payment);
        let result = engine.process_request(&request, &dependency).await?;
        println!(
            "Recovery request #{}: served by '{}' healed={}",
            i, result.strategy, result.healed
        );
    }

    let metrics = engine.get_metrics();
    println!(
        "\nFinal metrics: {} total, {} healed, {} exhausted, health {}",
        metrics.total_requests,
        metrics.healed_requests,
        metrics.exhausted_requests,
        metrics.system_health
    );

    engine.teardown();
    watcher.await?;

    println!("\n=== Example Complete ===");
    Ok(())
}
