//! Configuration loading, overrides and validation

use optibench::{Config, QuantizationLevel, TrialRunner};
use tempfile::TempDir;

#[test]
fn test_partial_file_falls_back_to_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("optibench.toml");
    std::fs::write(
        &path,
        r#"
[trials]
iterations = 5

[optimization]
quantization_level = "q5_0"
"#,
    )
    .unwrap();

    let config = Config::load_from_file(&path).unwrap();
    assert_eq!(config.trials.iterations, 5);
    assert_eq!(config.trials.inter_trial_delay_ms, 500);
    assert_eq!(config.optimization.quantization_level, QuantizationLevel::Q5_0);
    assert_eq!(config.backend.baseline_model, "mistral");
    assert_eq!(config.inventory.command, "ollama");
    assert!(config.validate().is_ok());

    let runner = TrialRunner::from_settings(&config.trials);
    assert_eq!(runner.iterations(), 5);
}

#[test]
fn test_generated_config_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("generated.toml");

    Config::default().save_to_file(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("[trials]"));
    assert!(text.contains("[backend]"));

    let parsed: Config = toml::from_str(&text).unwrap();
    assert_eq!(parsed.trials.iterations, Config::default().trials.iterations);
    assert_eq!(parsed.backend.endpoint, Config::default().backend.endpoint);
}

#[test]
fn test_invalid_values_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "[optimization]\npruning_ratio = 1.5\n").unwrap();

    let config = Config::load_from_file(&path).unwrap();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("Pruning ratio"));

    std::fs::write(&path, "[optimization]\nquantization_level = \"q3_k\"\n").unwrap();
    assert!(Config::load_from_file(&path).is_err());
}

#[test]
fn test_environment_overrides() {
    // Single test so no other test observes these variables
    std::env::set_var("OPTIBENCH_ITERATIONS", "7");
    std::env::set_var("OPTIBENCH_BASELINE_MODEL", "llama3");
    std::env::set_var("OPTIBENCH_BACKEND_ENDPOINT", "http://10.0.0.2:11434");
    std::env::set_var("OPTIBENCH_TRIAL_TIMEOUT_MS", "30000");

    let config = Config::load_from_env().unwrap();
    assert_eq!(config.trials.iterations, 7);
    assert_eq!(config.backend.baseline_model, "llama3");
    assert_eq!(config.backend.endpoint, "http://10.0.0.2:11434");
    assert_eq!(config.trials.trial_timeout_ms, Some(30000));

    std::env::set_var("OPTIBENCH_ITERATIONS", "many");
    assert!(Config::load_from_env().is_err());

    for var in [
        "OPTIBENCH_ITERATIONS",
        "OPTIBENCH_BASELINE_MODEL",
        "OPTIBENCH_BACKEND_ENDPOINT",
        "OPTIBENCH_TRIAL_TIMEOUT_MS",
    ] {
        std::env::remove_var(var);
    }
}
