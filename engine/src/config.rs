//! Configuration management for optibench

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::synthetic::QuantizationLevel;

/// Main benchmark configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub trials: TrialSettings,
    #[serde(default)]
    pub inventory: InventorySettings,
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub optimization: OptimizationSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrialSettings {
    pub iterations: u32,
    pub inter_trial_delay_ms: u64,
    pub cpu_sample_window_ms: u64,
    /// Per-trial deadline; unset means no deadline
    pub trial_timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InventorySettings {
    pub command: String,
    pub args: Vec<String>,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub endpoint: String,
    pub request_timeout_seconds: u64,
    pub baseline_model: String,
    pub default_question: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationSettings {
    pub pruning_ratio: f64,
    pub quantization_level: QuantizationLevel,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for TrialSettings {
    fn default() -> Self {
        Self {
            iterations: 3,
            inter_trial_delay_ms: 500,
            cpu_sample_window_ms: 100,
            trial_timeout_ms: None,
        }
    }
}

impl Default for InventorySettings {
    fn default() -> Self {
        Self {
            command: "ollama".to_string(),
            args: vec!["list".to_string()],
            timeout_seconds: 5,
        }
    }
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:11434".to_string(),
            request_timeout_seconds: 120,
            baseline_model: "mistral".to_string(),
            default_question: "What is autism?".to_string(),
        }
    }
}

impl Default for OptimizationSettings {
    fn default() -> Self {
        Self {
            pruning_ratio: 0.3,
            quantization_level: QuantizationLevel::Q4_0,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Self> {
        let mut config = Config::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Override fields from `OPTIBENCH_*` environment variables
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(iterations) = std::env::var("OPTIBENCH_ITERATIONS") {
            self.trials.iterations = iterations.parse()?;
        }

        if let Ok(timeout) = std::env::var("OPTIBENCH_TRIAL_TIMEOUT_MS") {
            self.trials.trial_timeout_ms = Some(timeout.parse()?);
        }

        if let Ok(endpoint) = std::env::var("OPTIBENCH_BACKEND_ENDPOINT") {
            self.backend.endpoint = endpoint;
        }

        if let Ok(model) = std::env::var("OPTIBENCH_BASELINE_MODEL") {
            self.backend.baseline_model = model;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.trials.iterations == 0 {
            return Err(anyhow::anyhow!("Benchmark iterations must be greater than 0"));
        }

        if self.trials.trial_timeout_ms == Some(0) {
            return Err(anyhow::anyhow!("Trial timeout must be greater than 0 when set"));
        }

        if self.inventory.command.trim().is_empty() {
            return Err(anyhow::anyhow!("Inventory command must not be empty"));
        }

        if self.inventory.timeout_seconds == 0 {
            return Err(anyhow::anyhow!("Inventory timeout must be greater than 0"));
        }

        if self.backend.baseline_model.trim().is_empty() {
            return Err(anyhow::anyhow!("Baseline model must not be empty"));
        }

        if !(0.0..=1.0).contains(&self.optimization.pruning_ratio) {
            return Err(anyhow::anyhow!(
                "Pruning ratio must be within [0, 1], got {}",
                self.optimization.pruning_ratio
            ));
        }

        Ok(())
    }
}
