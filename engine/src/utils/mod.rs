//! Utility helpers for optibench

use std::time::{Duration, Instant};

/// Timer utility for measuring execution time
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed().as_nanos() as f64 / 1_000_000.0
    }
}

/// Statistical utilities
pub mod stats {
    /// Arithmetic mean, `None` for an empty slice
    pub fn mean(values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    /// Nearest-rank percentile over an already sorted slice.
    ///
    /// Index is `floor(len * fraction)`, clamped to the last element.
    pub fn nearest_rank(sorted: &[f64], fraction: f64) -> Option<f64> {
        if sorted.is_empty() {
            return None;
        }
        let len = sorted.len();
        let index = (len as f64 * fraction) as usize;
        Some(sorted[index.min(len - 1)])
    }

    /// Sorted copy; NaN values sort last
    pub fn sorted(values: &[f64]) -> Vec<f64> {
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        sorted
    }
}

/// Format utilities
pub mod format {
    /// Signed percentage with two decimals, e.g. `+12.50%`
    pub fn percent_signed(value: f64) -> String {
        format!("{:+.2}%", value)
    }

    pub fn optional(value: Option<f64>) -> String {
        value.map(|v| v.to_string()).unwrap_or_default()
    }
}
