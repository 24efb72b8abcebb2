//! Fixed-bucket latency histogram.

use serde::{Deserialize, Serialize};

/// Upper bounds (inclusive, milliseconds) of the latency buckets.
pub const LATENCY_BUCKETS_MS: [f64; 6] = [10.0, 50.0, 100.0, 200.0, 500.0, 1000.0];

/// A cumulative latency histogram in the Prometheus style.
///
/// `counts[i]` holds observations `<= LATENCY_BUCKETS_MS[i]`; observations
/// above the last bound only show up in `count`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyHistogram {
    /// Cumulative counts per bucket, aligned with [`LATENCY_BUCKETS_MS`].
    pub counts: [u64; 6],
    /// Total observations (the `+Inf` bucket).
    pub count: u64,
    /// Sum of all observations in milliseconds.
    pub sum: f64,
}

impl LatencyHistogram {
    /// Creates an empty histogram.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one latency observation. Negative and NaN values count as 0.
    pub fn observe(&mut self, latency_ms: f64) {
        let value = if latency_ms.is_nan() { 0.0 } else { latency_ms.max(0.0) };
        for (bound, count) in LATENCY_BUCKETS_MS.iter().zip(self.counts.iter_mut()) {
            if value <= *bound {
                *count += 1;
            }
        }
        self.count += 1;
        self.sum += value;
    }

    /// Iterates `(upper bound, cumulative count)` pairs, ending with `+Inf`.
    pub fn buckets(&self) -> impl Iterator<Item = (f64, u64)> + '_ {
        LATENCY_BUCKETS_MS
            .iter()
            .copied()
            .zip(self.counts.iter().copied())
            .chain(std::iter::once((f64::INFINITY, self.count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cumulative_buckets() {
        let mut histogram = LatencyHistogram::new();
        histogram.observe(5.0);
        histogram.observe(50.0);
        histogram.observe(150.0);
        histogram.observe(5000.0);

        assert_eq!(histogram.counts, [1, 2, 2, 3, 3, 3]);
        assert_eq!(histogram.count, 4);
        assert!((histogram.sum - 5205.0).abs() < 1e-9);
    }

    #[test]
    fn test_buckets_end_with_inf() {
        let mut histogram = LatencyHistogram::new();
        histogram.observe(2000.0);

        let buckets: Vec<_> = histogram.buckets().collect();
        assert_eq!(buckets.len(), 7);
        assert_eq!(buckets[5], (1000.0, 0));
        assert_eq!(buckets[6].1, 1);
        assert!(buckets[6].0.is_infinite());
    }

    #[test]
    fn test_negative_observation_clamped() {
        let mut histogram = LatencyHistogram::new();
        histogram.observe(-3.0);
        assert_eq!(histogram.counts[0], 1);
        assert_eq!(histogram.sum, 0.0);
    }
}
