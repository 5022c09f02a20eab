//! Synthetic performance profiles
//!
//! These functions derive hypothetical metrics from a measured baseline for
//! techniques that are not actually applied to the model. Nothing here is a
//! measurement: every result built from them carries
//! [`Provenance::Synthetic`](crate::Provenance::Synthetic).

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BenchError, Result};
use crate::BenchmarkMetrics;

/// Per-field multipliers applied to a baseline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingProfile {
    pub response_time: f64,
    pub memory_usage: f64,
    pub cpu_usage: f64,
    pub tokens_per_second: f64,
    pub model_size: f64,
    pub latency_p50: f64,
    pub latency_p95: f64,
    pub latency_p99: f64,
}

impl ScalingProfile {
    /// Profile for a model with `ratio` of its weights pruned
    pub fn pruning(ratio: f64) -> Self {
        let latency = 1.0 - ratio * 0.2;
        Self {
            response_time: latency,
            memory_usage: 1.0 - ratio,
            cpu_usage: 1.0 - ratio * 0.15,
            tokens_per_second: 1.0 - ratio * 0.1,
            model_size: 1.0 - ratio,
            latency_p50: latency,
            latency_p95: latency,
            latency_p99: latency,
        }
    }

    /// Fixed profile for a quantized model
    pub fn quantization() -> Self {
        Self {
            response_time: 0.6,
            memory_usage: 0.5,
            cpu_usage: 0.7,
            tokens_per_second: 1.5,
            model_size: 0.4,
            latency_p50: 0.6,
            latency_p95: 0.65,
            latency_p99: 0.7,
        }
    }

    /// Scale `base`; optional fields stay absent when absent
    pub fn apply(&self, base: &BenchmarkMetrics) -> BenchmarkMetrics {
        BenchmarkMetrics {
            response_time: base.response_time * self.response_time,
            memory_usage_mb: base.memory_usage_mb * self.memory_usage,
            cpu_usage_percent: base.cpu_usage_percent * self.cpu_usage,
            tokens_per_second: base.tokens_per_second * self.tokens_per_second,
            model_size_mb: base.model_size_mb.map(|v| v * self.model_size),
            latency_p50: base.latency_p50.map(|v| v * self.latency_p50),
            latency_p95: base.latency_p95.map(|v| v * self.latency_p95),
            latency_p99: base.latency_p99.map(|v| v * self.latency_p99),
        }
    }
}

/// Reject ratios outside [0, 1], NaN included
pub fn validate_ratio(ratio: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&ratio) {
        Ok(ratio)
    } else {
        Err(BenchError::InvalidRatio(ratio))
    }
}

/// Synthetic metrics for `base` with `ratio` of the model pruned
pub fn simulate_pruning(base: &BenchmarkMetrics, ratio: f64) -> Result<BenchmarkMetrics> {
    let ratio = validate_ratio(ratio)?;
    Ok(ScalingProfile::pruning(ratio).apply(base))
}

/// Synthetic metrics for `base` after quantization
pub fn simulate_quantization(base: &BenchmarkMetrics) -> BenchmarkMetrics {
    ScalingProfile::quantization().apply(base)
}

/// Quantization formats understood by the backend runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuantizationLevel {
    #[serde(rename = "q4_0")]
    Q4_0,
    #[serde(rename = "q5_0")]
    Q5_0,
    #[serde(rename = "q8_0")]
    Q8_0,
}

impl QuantizationLevel {
    pub const ALL: [QuantizationLevel; 3] = [
        QuantizationLevel::Q4_0,
        QuantizationLevel::Q5_0,
        QuantizationLevel::Q8_0,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QuantizationLevel::Q4_0 => "q4_0",
            QuantizationLevel::Q5_0 => "q5_0",
            QuantizationLevel::Q8_0 => "q8_0",
        }
    }
}

impl std::fmt::Display for QuantizationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuantizationLevel {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        QuantizationLevel::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| BenchError::UnknownQuantizationLevel(s.to_string()))
    }
}

/// Display name for a quantized variant, e.g. `mistral-q4_0`
pub fn quantized_model_name(base: &str, level: QuantizationLevel) -> String {
    format!("{}-{}", base, level)
}

/// Display name for a pruned variant, e.g. `mistral-pruned-30%`
pub fn pruned_model_name(base: &str, ratio: f64) -> String {
    format!("{}-pruned-{}%", base, (ratio * 100.0) as u32)
}
