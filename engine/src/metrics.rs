//! Prometheus metrics for benchmark runs

use prometheus::{CounterVec, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry};

use crate::error::Result;
use crate::{OptimizationResult, Provenance, TrialReport};

/// Metrics registry owned by a [`BenchmarkEngine`](crate::BenchmarkEngine)
pub struct MetricsRegistry {
    prometheus_registry: Registry,

    // Trial metrics
    trials_total: CounterVec,
    trial_failures_total: CounterVec,
    response_time_seconds: HistogramVec,

    // Run metrics
    benchmark_runs_total: CounterVec,
    benchmark_failures_total: CounterVec,

    // Latest latency percentiles per model
    latency_ms: GaugeVec,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let prometheus_registry = Registry::new();

        let trials_total = CounterVec::new(
            Opts::new("optibench_trials_total", "Timed trials attempted"),
            &["model"],
        )?;
        prometheus_registry.register(Box::new(trials_total.clone()))?;

        let trial_failures_total = CounterVec::new(
            Opts::new("optibench_trial_failures_total", "Timed trials that failed"),
            &["model"],
        )?;
        prometheus_registry.register(Box::new(trial_failures_total.clone()))?;

        let response_time_seconds = HistogramVec::new(
            HistogramOpts::new(
                "optibench_response_time_seconds",
                "Mean response time of measured benchmark runs",
            )
            .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
            &["model"],
        )?;
        prometheus_registry.register(Box::new(response_time_seconds.clone()))?;

        let benchmark_runs_total = CounterVec::new(
            Opts::new("optibench_runs_total", "Benchmark results produced"),
            &["technique", "provenance"],
        )?;
        prometheus_registry.register(Box::new(benchmark_runs_total.clone()))?;

        let benchmark_failures_total = CounterVec::new(
            Opts::new("optibench_run_failures_total", "Benchmark runs with no successful trial"),
            &["model"],
        )?;
        prometheus_registry.register(Box::new(benchmark_failures_total.clone()))?;

        let latency_ms = GaugeVec::new(
            Opts::new("optibench_latency_milliseconds", "Latest latency percentile per model"),
            &["model", "quantile"],
        )?;
        prometheus_registry.register(Box::new(latency_ms.clone()))?;

        Ok(Self {
            prometheus_registry,
            trials_total,
            trial_failures_total,
            response_time_seconds,
            benchmark_runs_total,
            benchmark_failures_total,
            latency_ms,
        })
    }

    /// Record the trial accounting of a measured run
    pub fn record_trials(&self, model: &str, report: &TrialReport) {
        let attempted = (report.successful_trials + report.failed_trials) as f64;
        self.trials_total.with_label_values(&[model]).inc_by(attempted);
        if report.failed_trials > 0 {
            self.trial_failures_total
                .with_label_values(&[model])
                .inc_by(report.failed_trials as f64);
        }
    }

    /// Record a run in which every trial failed
    pub fn record_failed_run(&self, model: &str, attempted: u32) {
        self.trials_total.with_label_values(&[model]).inc_by(attempted as f64);
        self.trial_failures_total
            .with_label_values(&[model])
            .inc_by(attempted as f64);
        self.benchmark_failures_total.with_label_values(&[model]).inc();
    }

    /// Record a result returned to a caller
    pub fn record_result(&self, result: &OptimizationResult) {
        let provenance = result.provenance.to_string();
        self.benchmark_runs_total
            .with_label_values(&[result.technique.as_str(), provenance.as_str()])
            .inc();

        if result.provenance == Provenance::Synthetic {
            return;
        }

        let model = result.model_name.as_str();
        self.response_time_seconds
            .with_label_values(&[model])
            .observe(result.metrics.response_time);

        let percentiles = [
            ("p50", result.metrics.latency_p50),
            ("p95", result.metrics.latency_p95),
            ("p99", result.metrics.latency_p99),
        ];
        for (quantile, value) in percentiles {
            if let Some(value) = value {
                self.latency_ms.with_label_values(&[model, quantile]).set(value);
            }
        }
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> Result<String> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let metric_families = self.prometheus_registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
