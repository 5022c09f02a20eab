//! Benchmark engine
//!
//! Composes the trial runner, size resolver, synthetic adjuster, comparator
//! and history ledger behind one explicitly constructed value. Whoever owns
//! the outer surface (CLI, HTTP layer) builds one engine and shares it by
//! reference for the lifetime of the process.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::backend::QueryOperation;
use crate::compare::{improvement, Improvement};
use crate::config::Config;
use crate::error::{BenchError, Result};
use crate::history::HistoryLedger;
use crate::metrics::MetricsRegistry;
use crate::sampler::ProcessProbe;
use crate::size::{BackendInventory, CommandInventory, SizeResolver};
use crate::synthetic::{self, QuantizationLevel};
use crate::trial::{TrialReport, TrialRunner};
use crate::{BenchmarkMetrics, OptimizationResult, Technique};

/// Most recent baseline plus every recorded result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub baseline: Option<BenchmarkMetrics>,
    pub history: Vec<OptimizationResult>,
}

pub struct BenchmarkEngine<I: BackendInventory = CommandInventory> {
    config: Config,
    sizes: SizeResolver<I>,
    ledger: Arc<HistoryLedger>,
    baseline: RwLock<Option<BenchmarkMetrics>>,
    metrics: Arc<MetricsRegistry>,
}

impl BenchmarkEngine<CommandInventory> {
    /// Engine using the configured inventory command
    pub fn new(config: Config) -> Result<Self> {
        let sizes = SizeResolver::from_settings(&config.inventory);
        Self::with_size_resolver(config, sizes)
    }
}

impl<I: BackendInventory> BenchmarkEngine<I> {
    pub fn with_size_resolver(config: Config, sizes: SizeResolver<I>) -> Result<Self> {
        Ok(Self {
            config,
            sizes,
            ledger: Arc::new(HistoryLedger::new()),
            baseline: RwLock::new(None),
            metrics: Arc::new(MetricsRegistry::new()?),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn ledger(&self) -> Arc<HistoryLedger> {
        self.ledger.clone()
    }

    pub fn metrics(&self) -> Arc<MetricsRegistry> {
        self.metrics.clone()
    }

    /// Measure `backend` on `input` and record the result.
    ///
    /// A measured baseline also becomes the engine's current baseline. When
    /// every trial fails nothing is recorded.
    pub async fn run_benchmark<Q: QueryOperation>(
        &self,
        backend: &Q,
        model_name: &str,
        input: &str,
        technique: Technique,
        iterations: Option<u32>,
    ) -> Result<OptimizationResult> {
        let mut runner = TrialRunner::from_settings(&self.config.trials);
        if let Some(iterations) = iterations {
            runner = runner.with_iterations(iterations);
        }

        info!(
            model = model_name,
            technique = %technique,
            iterations = runner.iterations(),
            "Starting benchmark"
        );

        let probe = ProcessProbe::current()?;
        let report = match runner.run_with_report(backend, input, probe).await {
            Ok(report) => report,
            Err(e @ BenchError::NoSuccessfulTrials { attempted }) => {
                warn!(model = model_name, "Benchmark failed: {}", e);
                self.metrics.record_failed_run(model_name, attempted);
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        self.metrics.record_trials(model_name, &report);

        let model_size = self.sizes.resolve(model_name).await;
        let report = TrialReport {
            metrics: report.metrics.with_model_size(model_size),
            ..report
        };
        let result = OptimizationResult::measured(technique, model_name, &report);

        if result.technique == Technique::Baseline {
            *self.baseline.write().await = Some(result.metrics);
        }

        info!(
            model = model_name,
            technique = %result.technique,
            response_time = result.metrics.response_time,
            tokens_per_second = result.metrics.tokens_per_second,
            successful_trials = report.successful_trials,
            failed_trials = report.failed_trials,
            "Benchmark completed"
        );

        self.finish(result).await
    }

    /// Improvement of `after` over `before`
    pub fn compare(&self, before: &BenchmarkMetrics, after: &BenchmarkMetrics) -> Improvement {
        improvement(before, after)
    }

    /// Synthetic pruning result derived from the current baseline
    pub async fn simulate_pruning<Q: QueryOperation>(
        &self,
        backend: &Q,
        model_name: &str,
        input: &str,
        ratio: f64,
    ) -> Result<OptimizationResult> {
        let ratio = synthetic::validate_ratio(ratio)?;
        let before = self.baseline_or_measure(backend, model_name, input).await?;
        let after = synthetic::simulate_pruning(&before, ratio)?;

        info!(model = model_name, ratio, "Derived synthetic pruning profile");

        let result = OptimizationResult::synthetic(
            Technique::Pruning,
            synthetic::pruned_model_name(model_name, ratio),
            after,
            before,
        );
        self.finish(result).await
    }

    /// Synthetic quantization result derived from the current baseline
    pub async fn simulate_quantization<Q: QueryOperation>(
        &self,
        backend: &Q,
        model_name: &str,
        input: &str,
        level: QuantizationLevel,
    ) -> Result<OptimizationResult> {
        let before = self.baseline_or_measure(backend, model_name, input).await?;
        let after = synthetic::simulate_quantization(&before);

        info!(model = model_name, level = %level, "Derived synthetic quantization profile");

        let result = OptimizationResult::synthetic(
            Technique::Quantization,
            synthetic::quantized_model_name(model_name, level),
            after,
            before,
        );
        self.finish(result).await
    }

    /// Most recent measured baseline, if any
    pub async fn baseline(&self) -> Option<BenchmarkMetrics> {
        *self.baseline.read().await
    }

    pub async fn history(&self) -> HistorySnapshot {
        HistorySnapshot {
            baseline: self.baseline().await,
            history: self.ledger.all().await,
        }
    }

    async fn baseline_or_measure<Q: QueryOperation>(
        &self,
        backend: &Q,
        model_name: &str,
        input: &str,
    ) -> Result<BenchmarkMetrics> {
        if let Some(baseline) = self.baseline().await {
            return Ok(baseline);
        }

        info!(model = model_name, "No baseline recorded yet, measuring one");
        let result = self
            .run_benchmark(backend, model_name, input, Technique::Baseline, None)
            .await?;
        Ok(result.metrics)
    }

    async fn finish(&self, result: OptimizationResult) -> Result<OptimizationResult> {
        self.metrics.record_result(&result);
        self.ledger.record(result.clone()).await;
        Ok(result)
    }
}
