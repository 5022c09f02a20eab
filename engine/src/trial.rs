//! Repeated-trial benchmark runner
//!
//! One discarded warm-up call, then a fixed number of timed samples against a
//! single backend and input. Failed trials are excluded from every mean and
//! percentile; a run with no successful trial is an error.

use std::time::Duration;

use tokio::time;
use tracing::{debug, warn};

use crate::backend::QueryOperation;
use crate::config::TrialSettings;
use crate::error::{BenchError, Result};
use crate::sampler::{ResourceProbe, Sample, Sampler};
use crate::utils::stats;
use crate::BenchmarkMetrics;

/// Aggregated metrics together with the trial accounting behind them
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialReport {
    pub metrics: BenchmarkMetrics,
    pub successful_trials: u32,
    pub failed_trials: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct LatencyPercentiles {
    p50_ms: f64,
    p95_ms: f64,
    p99_ms: f64,
}

/// Nearest-rank percentiles over per-trial latencies in milliseconds
fn calculate_latency_percentiles(latencies_ms: &[f64]) -> Option<LatencyPercentiles> {
    let sorted = stats::sorted(latencies_ms);

    Some(LatencyPercentiles {
        p50_ms: stats::nearest_rank(&sorted, 0.50)?,
        p95_ms: stats::nearest_rank(&sorted, 0.95)?,
        p99_ms: stats::nearest_rank(&sorted, 0.99)?,
    })
}

/// Reduce successful samples into one summary; `None` when there are none
pub fn aggregate(samples: &[Sample]) -> Option<BenchmarkMetrics> {
    let latencies: Vec<f64> = samples.iter().map(|s| s.latency_secs).collect();
    let latencies_ms: Vec<f64> = samples.iter().map(Sample::latency_ms).collect();
    let memory: Vec<f64> = samples.iter().map(|s| s.memory_delta_mb).collect();
    let cpu: Vec<f64> = samples.iter().map(|s| s.cpu_percent).collect();
    let throughput: Vec<f64> = samples.iter().map(|s| s.tokens_per_second).collect();

    let percentiles = calculate_latency_percentiles(&latencies_ms)?;

    Some(BenchmarkMetrics {
        response_time: stats::mean(&latencies)?,
        memory_usage_mb: stats::mean(&memory)?,
        cpu_usage_percent: stats::mean(&cpu)?,
        tokens_per_second: stats::mean(&throughput)?,
        model_size_mb: None,
        latency_p50: Some(percentiles.p50_ms),
        latency_p95: Some(percentiles.p95_ms),
        latency_p99: Some(percentiles.p99_ms),
    })
}

pub struct TrialRunner {
    iterations: u32,
    inter_trial_delay: Duration,
    cpu_window: Duration,
    trial_timeout: Option<Duration>,
}

impl TrialRunner {
    pub fn new(iterations: u32) -> Self {
        let defaults = TrialSettings::default();
        Self {
            iterations,
            inter_trial_delay: Duration::from_millis(defaults.inter_trial_delay_ms),
            cpu_window: Duration::from_millis(defaults.cpu_sample_window_ms),
            trial_timeout: None,
        }
    }

    pub fn from_settings(settings: &TrialSettings) -> Self {
        Self {
            iterations: settings.iterations,
            inter_trial_delay: Duration::from_millis(settings.inter_trial_delay_ms),
            cpu_window: Duration::from_millis(settings.cpu_sample_window_ms),
            trial_timeout: settings.trial_timeout_ms.map(Duration::from_millis),
        }
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_inter_trial_delay(mut self, delay: Duration) -> Self {
        self.inter_trial_delay = delay;
        self
    }

    pub fn with_cpu_window(mut self, window: Duration) -> Self {
        self.cpu_window = window;
        self
    }

    pub fn with_trial_timeout(mut self, limit: Option<Duration>) -> Self {
        self.trial_timeout = limit;
        self
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Benchmark `op` on `input` and return the summary metrics
    pub async fn run<Q, P>(&self, op: &Q, input: &str, probe: P) -> Result<BenchmarkMetrics>
    where
        Q: QueryOperation,
        P: ResourceProbe,
    {
        Ok(self.run_with_report(op, input, probe).await?.metrics)
    }

    /// Benchmark `op` on `input`, keeping success and failure counts
    pub async fn run_with_report<Q, P>(&self, op: &Q, input: &str, probe: P) -> Result<TrialReport>
    where
        Q: QueryOperation,
        P: ResourceProbe,
    {
        if self.iterations == 0 {
            return Err(BenchError::InvalidIterations);
        }

        // Warm-up
        if let Err(e) = op.query(input).await {
            debug!("Warm-up query failed: {:#}", e);
        }

        let mut sampler = Sampler::new(probe, self.cpu_window).with_trial_timeout(self.trial_timeout);
        let mut samples = Vec::with_capacity(self.iterations as usize);
        let mut failed_trials = 0u32;

        for trial in 0..self.iterations {
            if trial > 0 && !self.inter_trial_delay.is_zero() {
                time::sleep(self.inter_trial_delay).await;
            }

            match sampler.sample(op, input).await {
                Ok(sample) => {
                    debug!(
                        trial,
                        latency_ms = sample.latency_ms(),
                        memory_delta_mb = sample.memory_delta_mb,
                        cpu_percent = sample.cpu_percent,
                        "Trial completed"
                    );
                    samples.push(sample);
                }
                Err(e) => {
                    warn!(trial, "Trial failed: {}", e);
                    failed_trials += 1;
                }
            }
        }

        let metrics = aggregate(&samples).ok_or(BenchError::NoSuccessfulTrials {
            attempted: self.iterations,
        })?;

        Ok(TrialReport {
            metrics,
            successful_trials: samples.len() as u32,
            failed_trials,
        })
    }
}

impl Default for TrialRunner {
    fn default() -> Self {
        Self::from_settings(&TrialSettings::default())
    }
}
