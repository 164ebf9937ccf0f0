//! Fixed-bucket histogram state for one label combination.

use std::fmt::Write;

use super::registry::format_value;

/// Bucket boundaries in seconds for database query latency:
/// 1, 5, 10, 50, 100, 500 ms and 1, 2, 5 s.
pub const DB_QUERY_BUCKETS: [f64; 9] = [0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0];

/// Observation counts for one histogram series.
///
/// Bucket counts are cumulative: an observation increments every bucket
/// whose upper bound is at least the observed value.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSeries {
    buckets: Vec<u64>,
    sum: f64,
    count: u64,
}

impl HistogramSeries {
    /// Creates an empty series with one counter per bucket boundary.
    #[must_use]
    pub fn new(bucket_count: usize) -> Self {
        Self {
            buckets: vec![0; bucket_count],
            sum: 0.0,
            count: 0,
        }
    }

    /// Records `value` against `bounds`.
    pub fn observe(&mut self, bounds: &[f64], value: f64) {
        self.sum += value;
        self.count += 1;
        for (bucket, &bound) in self.buckets.iter_mut().zip(bounds) {
            if value <= bound {
                *bucket += 1;
            }
        }
    }

    /// Total observations.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Sum of all observed values.
    #[must_use]
    pub const fn sum(&self) -> f64 {
        self.sum
    }

    /// Cumulative bucket counts, aligned with the instrument's bounds.
    #[must_use]
    pub fn buckets(&self) -> &[u64] {
        &self.buckets
    }

    /// Appends the `_bucket`, `_sum`, and `_count` lines for this series.
    ///
    /// `labels` is the already-rendered `k="v"` list without braces.
    pub(crate) fn write_exposition(&self, out: &mut String, name: &str, labels: &str, bounds: &[f64]) {
        let sep = if labels.is_empty() { "" } else { "," };
        for (&bound, cumulative) in bounds.iter().zip(&self.buckets) {
            let _ = writeln!(
                out,
                "{name}_bucket{{{labels}{sep}le=\"{}\"}} {cumulative}",
                format_value(bound)
            );
        }
        let _ = writeln!(out, "{name}_bucket{{{labels}{sep}le=\"+Inf\"}} {}", self.count);
        if labels.is_empty() {
            let _ = writeln!(out, "{name}_sum {}", format_value(self.sum));
            let _ = writeln!(out, "{name}_count {}", self.count);
        } else {
            let _ = writeln!(out, "{name}_sum{{{labels}}} {}", format_value(self.sum));
            let _ = writeln!(out, "{name}_count{{{labels}}} {}", self.count);
        }
    }
}
