//! Basic example: process requests through the engine.
//!
//! This example shows how to:
//! - Configure and build an engine
//! - Process requests against a simulated dependency
//! - Tell served results from healed ones
//! - Read metrics, strategies and learned rules
//!
//! Run with: cargo run --example basic_request

use adaptive_engine::prelude::*;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== Adaptive Engine Basic Example ===\n");

    let config = EngineConfig::new()
        .with_max_retries(3)
        .with_learning_threshold(5)
        .with_evolution_interval(20);
    let engine = Engine::new(config)?;

    let scenario = Scenario::normal_operations();
    println!("Scenario: {} ({})", scenario.name, scenario.description);

    let kinds = [
        RequestType::ApiCall,
        RequestType::Database,
        RequestType::Payment,
        RequestType::new("search"),
    ];

    for i in 0..40 {
        let request = Request::new(kinds[i % kinds.len()].clone());
        let result = engine.process_request(&request, &scenario).await?;

        if result.healed {
            println!(
                "Request #{:>2} [{}]: healed ({:?})",
                i + 1,
                request.request_type,
                result.heal_reason
            );
        } else {
            println!(
                "Request #{:>2} [{}]: served by '{}' in {:.0} ms after {} attempt(s)",
                i + 1,
                request.request_type,
                result.strategy,
                result.response_time_ms,
                result.attempts
            );
        }
    }

    let metrics = engine.get_metrics();
    println!("\n=== Metrics ===");
    println!("Total requests: {}", metrics.total_requests);
    println!("Successful: {}", metrics.successful_requests);
    println!("Healed: {}", metrics.healed_requests);
    println!("Average response: {:.1} ms", metrics.avg_response_time_ms);
    println!("System health: {}", metrics.system_health);

    println!("\n=== Strategies ===");
    for strategy in engine.strategies() {
        println!(
            "  {:<12} attempts={:<3} successes={:<3} ema={:.1} ms",
            strategy.name, strategy.total_attempts, strategy.success_count, strategy.ema_latency_ms
        );
    }

    println!("\n=== Learned Rules ===");
    for rule in engine.learned_rules() {
        println!(
            "  {} -> {} ({} occurrences)",
            rule.pattern, rule.dominant_strategy, rule.occurrences
        );
    }

    println!("\n=== Prometheus ===");
    print!("{}", metrics.render_prometheus());

    engine.teardown();
    println!("\n=== Example Complete ===");
    Ok(())
}
