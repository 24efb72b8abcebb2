//! Request counters, the health score and the metrics snapshot.

use crate::metrics::histogram::LatencyHistogram;

use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Point-in-time view of an engine's metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    /// Requests that entered `process_request`.
    pub started_requests: u64,
    /// Requests that produced a result.
    pub total_requests: u64,
    /// Requests served by a strategy.
    pub successful_requests: u64,
    /// Requests reported to the caller as failed.
    pub failed_requests: u64,
    /// Requests answered with a fallback.
    pub healed_requests: u64,
    /// Requests whose retries were all exhausted.
    pub exhausted_requests: u64,
    /// Running mean of reported response times in milliseconds.
    pub avg_response_time_ms: f64,
    /// Health score from 0 to 100.
    pub system_health: u8,
    /// Rules learned by the pattern learner.
    pub learned_rules: u64,
    /// Strategies produced by evolution.
    pub strategies_evolved: u64,
    /// Whether the circuit breaker is currently open.
    pub circuit_open: bool,
    /// Distribution of reported response times.
    pub latency_histogram: LatencyHistogram,
}

impl Metrics {
    /// Renders the snapshot in the Prometheus text exposition format.
    pub fn render_prometheus(&self) -> String {
        let mut out = String::new();

        let counters = [
            ("total_requests", "Total requests processed", self.total_requests),
            ("successful_requests", "Requests served by a strategy", self.successful_requests),
            ("healed_requests", "Self-healed requests after failures", self.healed_requests),
            ("failed_requests", "Requests reported as failed", self.failed_requests),
            ("exhausted_requests", "Requests whose retries were exhausted", self.exhausted_requests),
        ];
        for (name, help, value) in counters {
            let _ = writeln!(out, "# HELP adaptive_engine_{name} {help}");
            let _ = writeln!(out, "# TYPE adaptive_engine_{name} counter");
            let _ = writeln!(out, "adaptive_engine_{name} {value}");
        }

        let gauges = [
            ("learned_rules_total", "Total number of learned routing rules", self.learned_rules as f64),
            ("strategies_evolved_total", "Total number of evolved strategies", self.strategies_evolved as f64),
            ("system_health_percent", "System health (0-100)", f64::from(self.system_health)),
            ("avg_response_time_ms", "Mean response time in milliseconds", self.avg_response_time_ms),
            ("circuit_open", "Whether the circuit breaker is open", if self.circuit_open { 1.0 } else { 0.0 }),
        ];
        for (name, help, value) in gauges {
            let _ = writeln!(out, "# HELP adaptive_engine_{name} {help}");
            let _ = writeln!(out, "# TYPE adaptive_engine_{name} gauge");
            let _ = writeln!(out, "adaptive_engine_{name} {value}");
        }

        let name = "adaptive_engine_response_duration_ms";
        let _ = writeln!(out, "# HELP {name} Response time in milliseconds");
        let _ = writeln!(out, "# TYPE {name} histogram");
        for (bound, count) in self.latency_histogram.buckets() {
            if bound.is_infinite() {
                let _ = writeln!(out, "{name}_bucket{{le=\"+Inf\"}} {count}");
            } else {
                let _ = writeln!(out, "{name}_bucket{{le=\"{bound}\"}} {count}");
            }
        }
        let _ = writeln!(out, "{name}_sum {}", self.latency_histogram.sum);
        let _ = writeln!(out, "{name}_count {}", self.latency_histogram.count);

        out
    }
}

/// Accumulates per-request outcomes.
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    started_requests: u64,
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    healed_requests: u64,
    exhausted_requests: u64,
    avg_response_time_ms: f64,
    system_health: u8,
    histogram: LatencyHistogram,
}

impl MetricsCollector {
    /// Creates a collector. Health starts at 100 until a request completes.
    pub fn new() -> Self {
        Self {
            started_requests: 0,
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            healed_requests: 0,
            exhausted_requests: 0,
            avg_response_time_ms: 0.0,
            system_health: 100,
            histogram: LatencyHistogram::new(),
        }
    }

    /// Records that a request entered processing.
    pub fn record_attempt_start(&mut self) {
        self.started_requests += 1;
    }

    /// Records the outcome of a processed request.
    pub fn record_outcome(&mut self, success: bool, healed: bool, latency_ms: f64) {
        self.total_requests += 1;
        if success && !healed {
            self.successful_requests += 1;
        }
        if !success {
            self.failed_requests += 1;
        }
        if healed {
            self.healed_requests += 1;
        }

        let total = self.total_requests as f64;
        self.avg_response_time_ms =
            (self.avg_response_time_ms * (total - 1.0) + latency_ms) / total;

        let success_rate = self.successful_requests as f64 / self.total_requests.max(1) as f64;
        self.system_health = (success_rate * 100.0).round().clamp(0.0, 100.0) as u8;

        self.histogram.observe(latency_ms);
    }

    /// Records a request whose retries were all exhausted.
    pub fn record_exhausted(&mut self) {
        self.exhausted_requests += 1;
    }

    /// Requests that produced a result so far.
    pub fn total_requests(&self) -> u64 {
        self.total_requests
    }

    /// Builds a snapshot, filling in the figures owned by other components.
    pub fn snapshot(&self, learned_rules: u64, strategies_evolved: u64, circuit_open: bool) -> Metrics {
        Metrics {
            started_requests: self.started_requests,
            total_requests: self.total_requests,
            successful_requests: self.successful_requests,
            failed_requests: self.failed_requests,
            healed_requests: self.healed_requests,
            exhausted_requests: self.exhausted_requests,
            avg_response_time_ms: self.avg_response_time_ms,
            system_health: self.system_health,
            learned_rules,
            strategies_evolved,
            circuit_open,
            latency_histogram: self.histogram.clone(),
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_health() {
        let metrics = MetricsCollector::new().snapshot(0, 0, false);
        assert_eq!(metrics.system_health, 100);
        assert_eq!(metrics.total_requests, 0);
    }

    #[test]
    fn test_outcome_counters() {
        let mut collector = MetricsCollector::new();
        collector.record_outcome(true, false, 50.0);
        collector.record_outcome(true, true, 100.0);
        collector.record_outcome(false, true, 100.0);

        let metrics = collector.snapshot(0, 0, false);
        assert_eq!(metrics.total_requests, 3);
        assert_eq!(metrics.successful_requests, 1);
        assert_eq!(metrics.healed_requests, 2);
        assert_eq!(metrics.failed_requests, 1);
        assert_eq!(metrics.system_health, 33);
    }

    #[test]
    fn test_running_mean() {
        let mut collector = MetricsCollector::new();
        for latency in [10.0, 20.0, 30.0, 40.0] {
            collector.record_outcome(true, false, latency);
        }
        let metrics = collector.snapshot(0, 0, false);
        assert!((metrics.avg_response_time_ms - 25.0).abs() < 1e-9);
        assert_eq!(metrics.latency_histogram.count, 4);
    }

    #[test]
    fn test_health_tracks_success_rate() {
        let mut collector = MetricsCollector::new();
        collector.record_outcome(true, false, 50.0);
        collector.record_outcome(true, true, 100.0);
        assert_eq!(collector.snapshot(0, 0, false).system_health, 50);

        collector.record_outcome(true, false, 50.0);
        collector.record_outcome(true, false, 50.0);
        assert_eq!(collector.snapshot(0, 0, false).system_health, 75);
    }

    #[test]
    fn test_render_prometheus() {
        let mut collector = MetricsCollector::new();
        collector.record_attempt_start();
        collector.record_outcome(true, false, 42.0);
        let text = collector.snapshot(2, 1, true).render_prometheus();

        assert!(text.contains("# TYPE adaptive_engine_total_requests counter"));
        assert!(text.contains("adaptive_engine_total_requests 1"));
        assert!(text.contains("adaptive_engine_learned_rules_total 2"));
        assert!(text.contains("adaptive_engine_circuit_open 1"));
        assert!(text.contains("adaptive_engine_response_duration_ms_bucket{le=\"50\"} 1"));
        assert!(text.contains("adaptive_engine_response_duration_ms_bucket{le=\"+Inf\"} 1"));
        assert!(text.contains("adaptive_engine_response_duration_ms_count 1"));
    }
}
