//! Optibench: inference backend benchmarking
//!
//! This crate measures and compares the runtime cost of interchangeable
//! inference backends (a baseline model and variants reached by swapping model
//! identifiers), including:
//!
//! - Repeated timed trials with latency, memory, CPU and throughput sampling
//! - Nearest-rank latency percentiles
//! - Signed relative-improvement reports between two summaries
//! - Synthetic profiles for techniques that cannot be measured directly
//! - A process-lifetime ledger of every benchmark run

pub mod backend;
pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod metrics;
pub mod sampler;
pub mod size;
pub mod synthetic;
pub mod trial;
pub mod utils;

pub use backend::{OllamaBackend, QueryOperation};
pub use compare::{improvement, Improvement, Metric, MetricDirection};
pub use config::Config;
pub use engine::{BenchmarkEngine, HistorySnapshot};
pub use error::{BenchError, Result};
pub use history::HistoryLedger;
pub use size::{BackendInventory, CommandInventory, SizeResolver};
pub use synthetic::QuantizationLevel;
pub use trial::{TrialReport, TrialRunner};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary of one benchmark run
///
/// Means are taken over successful trials only. Latency percentiles are in
/// milliseconds, `response_time` is in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkMetrics {
    #[serde(rename = "responseTime")]
    pub response_time: f64,
    #[serde(rename = "memoryUsageMB")]
    pub memory_usage_mb: f64,
    #[serde(rename = "cpuUsagePercent")]
    pub cpu_usage_percent: f64,
    #[serde(rename = "tokensPerSecond")]
    pub tokens_per_second: f64,
    #[serde(rename = "modelSizeMB", default)]
    pub model_size_mb: Option<f64>,
    #[serde(rename = "latencyP50", default)]
    pub latency_p50: Option<f64>,
    #[serde(rename = "latencyP95", default)]
    pub latency_p95: Option<f64>,
    #[serde(rename = "latencyP99", default)]
    pub latency_p99: Option<f64>,
}

impl BenchmarkMetrics {
    /// Copy of these metrics with the model footprint filled in
    pub fn with_model_size(self, model_size_mb: Option<f64>) -> Self {
        Self {
            model_size_mb,
            ..self
        }
    }
}

/// How a benchmarked backend differs from the baseline
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Technique {
    Baseline,
    Quantization,
    Pruning,
    /// Caller-supplied label; build with [`Technique::custom`] so reserved
    /// labels map to their named variants
    Custom(String),
}

impl Technique {
    /// Technique for `label`; `baseline`, `quantization` and `pruning` map to
    /// their named variants
    pub fn custom(label: impl Into<String>) -> Self {
        Technique::from(label.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Technique::Baseline => "baseline",
            Technique::Quantization => "quantization",
            Technique::Pruning => "pruning",
            Technique::Custom(label) => label,
        }
    }
}

impl From<String> for Technique {
    fn from(label: String) -> Self {
        match label.as_str() {
            "baseline" => Technique::Baseline,
            "quantization" => Technique::Quantization,
            "pruning" => Technique::Pruning,
            _ => Technique::Custom(label),
        }
    }
}

impl From<&str> for Technique {
    fn from(label: &str) -> Self {
        Technique::from(label.to_string())
    }
}

impl From<Technique> for String {
    fn from(technique: Technique) -> Self {
        technique.as_str().to_string()
    }
}

impl std::fmt::Display for Technique {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a result was measured or derived by formula from a baseline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Measured,
    Synthetic,
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provenance::Measured => write!(f, "measured"),
            Provenance::Synthetic => write!(f, "synthetic"),
        }
    }
}

/// Outcome of one benchmark request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub technique: Technique,
    pub model_name: String,
    pub metrics: BenchmarkMetrics,
    #[serde(default)]
    pub before_metrics: Option<BenchmarkMetrics>,
    #[serde(default)]
    pub improvement_percent: Option<Improvement>,
    pub provenance: Provenance,
    pub successful_trials: u32,
    pub failed_trials: u32,
    pub timestamp: DateTime<Utc>,
}

impl OptimizationResult {
    /// Result of a real measurement
    pub fn measured(technique: Technique, model_name: impl Into<String>, report: &TrialReport) -> Self {
        Self {
            technique,
            model_name: model_name.into(),
            metrics: report.metrics,
            before_metrics: None,
            improvement_percent: None,
            provenance: Provenance::Measured,
            successful_trials: report.successful_trials,
            failed_trials: report.failed_trials,
            timestamp: Utc::now(),
        }
    }

    /// Result derived from `before` by a synthetic profile
    pub fn synthetic(
        technique: Technique,
        model_name: impl Into<String>,
        metrics: BenchmarkMetrics,
        before: BenchmarkMetrics,
    ) -> Self {
        Self {
            technique,
            model_name: model_name.into(),
            metrics,
            before_metrics: Some(before),
            improvement_percent: Some(improvement(&before, &metrics)),
            provenance: Provenance::Synthetic,
            successful_trials: 0,
            failed_trials: 0,
            timestamp: Utc::now(),
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.provenance == Provenance::Synthetic
    }
}
