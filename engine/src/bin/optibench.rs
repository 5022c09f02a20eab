//! Optibench command line runner
//!
//! Benchmarks Ollama-served models through the engine and prints the
//! recorded results.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use optibench::config::LoggingSettings;
use optibench::{
    utils::format, BenchmarkEngine, Config, HistorySnapshot, Improvement, OllamaBackend,
    QuantizationLevel, Technique,
};
use serde::Serialize;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_CONFIG_PATH: &str = "optibench.toml";

#[derive(Parser)]
#[command(name = "optibench")]
#[command(about = "Compare inference backends by latency, memory, CPU and throughput")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (overrides the configured level)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    json_logs: bool,

    /// Output format (json, csv)
    #[arg(short, long, default_value = "json")]
    output: String,

    /// Output file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Also write Prometheus metrics to this file
    #[arg(long)]
    metrics_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Measure one backend
    Run {
        /// Model identifier (defaults to the configured baseline model)
        #[arg(short, long)]
        model: Option<String>,

        /// Technique label: baseline, quantization, pruning or a custom label
        #[arg(short, long, default_value = "baseline")]
        technique: String,

        /// Question sent on every trial
        #[arg(short, long)]
        question: Option<String>,

        /// Number of timed trials
        #[arg(short, long)]
        iterations: Option<u32>,
    },
    /// Measure a baseline and a candidate backend and report the improvement
    Compare {
        /// Baseline model identifier
        #[arg(short, long)]
        baseline: Option<String>,

        /// Candidate model identifier, e.g. mistral:7b-instruct-q4_0
        #[arg(short, long)]
        candidate: String,

        /// Technique label for the candidate
        #[arg(short, long, default_value = "quantization")]
        technique: String,

        #[arg(short, long)]
        question: Option<String>,

        #[arg(short, long)]
        iterations: Option<u32>,
    },
    /// Derive a synthetic profile from a measured baseline
    Simulate {
        #[command(subcommand)]
        profile: Profile,
    },
    /// Validate the configuration
    Validate,
    /// Generate a sample configuration file
    Config {
        /// Where to write the configuration
        #[arg(default_value = DEFAULT_CONFIG_PATH)]
        path: PathBuf,
    },
}

#[derive(Subcommand)]
enum Profile {
    /// Pruned variant of the baseline model
    Pruning {
        /// Fraction of the model removed, within [0, 1]
        #[arg(short, long)]
        ratio: Option<f64>,

        #[arg(short, long)]
        model: Option<String>,

        #[arg(short, long)]
        question: Option<String>,
    },
    /// Quantized variant of the baseline model
    Quantization {
        /// Quantization level (q4_0, q5_0, q8_0)
        #[arg(short, long)]
        level: Option<String>,

        #[arg(short, long)]
        model: Option<String>,

        #[arg(short, long)]
        question: Option<String>,
    },
}

/// Everything printed at the end of a benchmark command
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CommandOutput {
    #[serde(flatten)]
    snapshot: HistorySnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    comparison: Option<Improvement>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.command {
        Commands::Validate | Commands::Config { .. } => {
            initialize_logging(&cli, &LoggingSettings::default())?;
            return match &cli.command {
                Commands::Config { path } => generate_config_command(path),
                _ => validate_config_command(&cli),
            };
        }
        _ => load_configuration(&cli)?,
    };

    initialize_logging(&cli, &config.logging)?;
    info!(
        iterations = config.trials.iterations,
        endpoint = %config.backend.endpoint,
        "Configuration loaded"
    );

    let engine = BenchmarkEngine::new(config.clone())?;
    let backend = OllamaBackend::new(
        config.backend.endpoint.clone(),
        config.backend.baseline_model.clone(),
        Duration::from_secs(config.backend.request_timeout_seconds),
    )?;

    let comparison = match &cli.command {
        Commands::Run {
            model,
            technique,
            question,
            iterations,
        } => {
            let model = model.clone().unwrap_or_else(|| config.backend.baseline_model.clone());
            let question = question.as_deref().unwrap_or(&config.backend.default_question);
            engine
                .run_benchmark(
                    &backend.with_model(model.clone()),
                    &model,
                    question,
                    Technique::custom(technique.as_str()),
                    *iterations,
                )
                .await?;
            None
        }
        Commands::Compare {
            baseline,
            candidate,
            technique,
            question,
            iterations,
        } => {
            let baseline = baseline.clone().unwrap_or_else(|| config.backend.baseline_model.clone());
            let question = question.as_deref().unwrap_or(&config.backend.default_question);

            let before = engine
                .run_benchmark(
                    &backend.with_model(baseline.clone()),
                    &baseline,
                    question,
                    Technique::Baseline,
                    *iterations,
                )
                .await?;
            let after = engine
                .run_benchmark(
                    &backend.with_model(candidate.clone()),
                    candidate,
                    question,
                    Technique::custom(technique.as_str()),
                    *iterations,
                )
                .await?;

            let improvement = engine.compare(&before.metrics, &after.metrics);
            for (metric, pct) in &improvement {
                info!("{} {}: {}", candidate, metric, format::percent_signed(*pct));
            }
            Some(improvement)
        }
        Commands::Simulate { profile } => {
            match profile {
                Profile::Pruning { ratio, model, question } => {
                    let model = model.clone().unwrap_or_else(|| config.backend.baseline_model.clone());
                    let question = question.as_deref().unwrap_or(&config.backend.default_question);
                    let ratio = ratio.unwrap_or(config.optimization.pruning_ratio);
                    engine
                        .simulate_pruning(&backend.with_model(model.clone()), &model, question, ratio)
                        .await?;
                }
                Profile::Quantization { level, model, question } => {
                    let model = model.clone().unwrap_or_else(|| config.backend.baseline_model.clone());
                    let question = question.as_deref().unwrap_or(&config.backend.default_question);
                    let level = match level {
                        Some(level) => level.parse::<QuantizationLevel>()?,
                        None => config.optimization.quantization_level,
                    };
                    engine
                        .simulate_quantization(&backend.with_model(model.clone()), &model, question, level)
                        .await?;
                }
            }
            warn!("Simulated results are derived from the baseline by formula, not measured");
            None
        }
        Commands::Validate | Commands::Config { .. } => None,
    };

    let output = CommandOutput {
        snapshot: engine.history().await,
        comparison,
    };
    output_results(&output, &cli.output, cli.file.as_deref())?;

    if let Some(path) = &cli.metrics_file {
        std::fs::write(path, engine.metrics().export_prometheus()?)?;
        info!("Metrics written to: {}", path.display());
    }

    Ok(())
}

fn initialize_logging(cli: &Cli, settings: &LoggingSettings) -> Result<()> {
    let level = cli.log_level.as_deref().unwrap_or(&settings.level);
    let log_level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(format!("optibench={}", log_level).parse()?)
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?);

    if cli.json_logs || settings.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

/// Load configuration from file or defaults, then apply environment overrides
fn load_configuration(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(path) = &cli.config {
        Config::load_from_file(path)?
    } else if Path::new(DEFAULT_CONFIG_PATH).exists() {
        Config::load_from_file(DEFAULT_CONFIG_PATH)?
    } else {
        Config::default()
    };

    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

fn validate_config_command(cli: &Cli) -> Result<()> {
    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    info!("Validating configuration file: {}", path.display());

    match Config::load_from_file(&path).and_then(|config| config.validate()) {
        Ok(()) => {
            info!("Configuration file is valid");
            Ok(())
        }
        Err(e) => {
            warn!("Configuration file is invalid: {}", e);
            Err(e)
        }
    }
}

fn generate_config_command(path: &Path) -> Result<()> {
    Config::default().save_to_file(path)?;
    info!("Generated sample configuration: {}", path.display());
    Ok(())
}

fn output_results(output: &CommandOutput, format: &str, output_file: Option<&Path>) -> Result<()> {
    let rendered = match format {
        "json" => serde_json::to_string_pretty(output)?,
        "csv" => results_to_csv(&output.snapshot),
        _ => return Err(anyhow::anyhow!("Unsupported output format: {}", format)),
    };

    if let Some(file_path) = output_file {
        std::fs::write(file_path, rendered)?;
        info!("Results written to: {}", file_path.display());
    } else {
        println!("{}", rendered);
    }

    Ok(())
}

fn results_to_csv(snapshot: &HistorySnapshot) -> String {
    let mut csv = String::new();
    csv.push_str("technique,model_name,provenance,response_time,memory_usage_mb,cpu_usage_percent,tokens_per_second,model_size_mb,latency_p50,latency_p95,latency_p99,successful_trials,failed_trials\n");

    for result in &snapshot.history {
        let m = &result.metrics;
        csv.push_str(&format!(
            "{},{},{},{},{},{},{},{},{},{},{},{},{}\n",
            result.technique,
            result.model_name,
            result.provenance,
            m.response_time,
            m.memory_usage_mb,
            m.cpu_usage_percent,
            m.tokens_per_second,
            format::optional(m.model_size_mb),
            format::optional(m.latency_p50),
            format::optional(m.latency_p95),
            format::optional(m.latency_p99),
            result.successful_trials,
            result.failed_trials,
        ));
    }

    csv
}
