//! Relative improvement between two benchmark summaries
//!
//! Every metric declares whether lower or higher values are better, and the
//! sign of the reported percentage is normalized so that a positive number
//! always means an improvement.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::BenchmarkMetrics;

/// Metrics that take part in comparisons
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Metric {
    #[serde(rename = "responseTime")]
    ResponseTime,
    #[serde(rename = "memoryUsageMB")]
    MemoryUsage,
    #[serde(rename = "cpuUsagePercent")]
    CpuUsage,
    #[serde(rename = "tokensPerSecond")]
    TokensPerSecond,
    #[serde(rename = "modelSizeMB")]
    ModelSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricDirection {
    /// Cost metrics: a reduction is an improvement
    LowerIsBetter,
    /// Throughput metrics: an increase is an improvement
    HigherIsBetter,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::ResponseTime,
        Metric::MemoryUsage,
        Metric::CpuUsage,
        Metric::TokensPerSecond,
        Metric::ModelSize,
    ];

    pub fn direction(&self) -> MetricDirection {
        match self {
            Metric::ResponseTime | Metric::MemoryUsage | Metric::CpuUsage | Metric::ModelSize => {
                MetricDirection::LowerIsBetter
            }
            Metric::TokensPerSecond => MetricDirection::HigherIsBetter,
        }
    }

    /// Field name used in serialized output
    pub fn name(&self) -> &'static str {
        match self {
            Metric::ResponseTime => "responseTime",
            Metric::MemoryUsage => "memoryUsageMB",
            Metric::CpuUsage => "cpuUsagePercent",
            Metric::TokensPerSecond => "tokensPerSecond",
            Metric::ModelSize => "modelSizeMB",
        }
    }

    /// Value of this metric in `metrics`, if recorded
    pub fn value(&self, metrics: &BenchmarkMetrics) -> Option<f64> {
        match self {
            Metric::ResponseTime => Some(metrics.response_time),
            Metric::MemoryUsage => Some(metrics.memory_usage_mb),
            Metric::CpuUsage => Some(metrics.cpu_usage_percent),
            Metric::TokensPerSecond => Some(metrics.tokens_per_second),
            Metric::ModelSize => metrics.model_size_mb,
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Improvement percentages keyed by metric
pub type Improvement = BTreeMap<Metric, f64>;

/// Signed percent change from `before` to `after`, positive when improved.
///
/// `None` when the ratio is undefined (`before` not strictly positive).
pub fn percent_change(direction: MetricDirection, before: f64, after: f64) -> Option<f64> {
    if before.is_nan() || before <= 0.0 {
        return None;
    }
    let delta = match direction {
        MetricDirection::LowerIsBetter => before - after,
        MetricDirection::HigherIsBetter => after - before,
    };
    Some(delta / before * 100.0)
}

/// Per-metric improvement of `after` over `before`.
///
/// Metrics whose baseline is absent or not positive are omitted, as are
/// metrics missing from `after`.
pub fn improvement(before: &BenchmarkMetrics, after: &BenchmarkMetrics) -> Improvement {
    Metric::ALL
        .iter()
        .filter_map(|metric| {
            let before_value = metric.value(before)?;
            let after_value = metric.value(after)?;
            percent_change(metric.direction(), before_value, after_value).map(|pct| (*metric, pct))
        })
        .collect()
}
