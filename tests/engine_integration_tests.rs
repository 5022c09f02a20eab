//! End-to-end tests of the benchmark engine against scripted backends

use std::time::Duration;

use futures::future::join_all;
use optibench::{
    BenchError, BenchmarkEngine, Metric, QuantizationLevel, SizeResolver, Technique,
};
use optibench_tests::{fast_config, test_engine, test_setup, MockInventory, ScriptedBackend};

const QUESTION: &str = "What is autism?";

#[tokio::test]
async fn test_baseline_run_end_to_end() {
    test_setup!();
    let engine = test_engine(3);
    let backend = ScriptedBackend::new("Autism is a neurodevelopmental condition.");

    let result = engine
        .run_benchmark(&backend, "mistral", QUESTION, Technique::Baseline, None)
        .await
        .unwrap();

    // Warm-up plus three timed trials
    assert_eq!(backend.calls(), 4);
    assert_eq!(result.successful_trials, 3);
    assert_eq!(result.failed_trials, 0);
    assert!(!result.is_synthetic());

    let metrics = result.metrics;
    assert!(metrics.response_time > 0.0);
    assert!(metrics.tokens_per_second > 0.0);
    assert!((metrics.model_size_mb.unwrap() - 4198.4).abs() < 1e-9);

    let (p50, p95, p99) = (
        metrics.latency_p50.unwrap(),
        metrics.latency_p95.unwrap(),
        metrics.latency_p99.unwrap(),
    );
    assert!(p50 <= p95 && p95 <= p99);

    let snapshot = engine.history().await;
    assert_eq!(snapshot.baseline, Some(metrics));
    assert_eq!(snapshot.history, vec![result]);
}

#[tokio::test]
async fn test_one_failed_trial_is_excluded() {
    test_setup!();
    let engine = test_engine(3);
    let backend = ScriptedBackend::new("answer").failing_on(&[2]);

    let result = engine
        .run_benchmark(&backend, "mistral", QUESTION, Technique::Baseline, None)
        .await
        .unwrap();

    assert_eq!(result.successful_trials, 2);
    assert_eq!(result.failed_trials, 1);
    assert_eq!(engine.ledger().len().await, 1);
}

#[tokio::test]
async fn test_warm_up_failure_is_ignored() {
    let engine = test_engine(3);
    let backend = ScriptedBackend::new("answer").failing_on(&[0]);

    let result = engine
        .run_benchmark(&backend, "mistral", QUESTION, Technique::Baseline, None)
        .await
        .unwrap();

    assert_eq!(result.successful_trials, 3);
    assert_eq!(result.failed_trials, 0);
}

#[tokio::test]
async fn test_all_trials_failing_records_nothing() {
    test_setup!();
    let engine = test_engine(3);
    let backend = ScriptedBackend::offline();

    let err = engine
        .run_benchmark(&backend, "mistral", QUESTION, Technique::Baseline, None)
        .await
        .unwrap_err();

    assert!(matches!(err, BenchError::NoSuccessfulTrials { attempted: 3 }));
    assert!(!err.is_recoverable());
    assert!(engine.ledger().is_empty().await);
    assert_eq!(engine.baseline().await, None);

    let exported = engine.metrics().export_prometheus().unwrap();
    assert!(exported.contains("optibench_run_failures_total{model=\"mistral\"} 1"));
}

#[tokio::test]
async fn test_trial_timeout_fails_slow_trials() {
    let mut config = fast_config(2);
    config.trials.trial_timeout_ms = Some(5);
    let sizes = SizeResolver::new(MockInventory::listing(""), Duration::from_secs(1));
    let engine = BenchmarkEngine::with_size_resolver(config, sizes).unwrap();
    let backend = ScriptedBackend::new("answer").with_latency(Duration::from_millis(100));

    let err = engine
        .run_benchmark(&backend, "mistral", QUESTION, Technique::Baseline, None)
        .await
        .unwrap_err();

    assert!(matches!(err, BenchError::NoSuccessfulTrials { attempted: 2 }));
}

#[tokio::test]
async fn test_unknown_model_serializes_size_as_null() {
    let engine = test_engine(1);
    let backend = ScriptedBackend::new("answer");

    let result = engine
        .run_benchmark(&backend, "phi3", QUESTION, Technique::from("distillation"), None)
        .await
        .unwrap();

    assert_eq!(result.metrics.model_size_mb, None);
    // Only baseline runs update the baseline slot
    assert_eq!(engine.baseline().await, None);

    let json = serde_json::to_value(&result).unwrap();
    assert!(json["metrics"]["modelSizeMB"].is_null());
    assert!(json["beforeMetrics"].is_null());
    assert!(json["improvementPercent"].is_null());
    assert_eq!(json["technique"], "distillation");
    assert_eq!(json["provenance"], "measured");
}

#[tokio::test]
async fn test_unavailable_inventory_does_not_fail_run() {
    let sizes = SizeResolver::new(MockInventory::unavailable("ollama not found"), Duration::from_secs(1));
    let engine = BenchmarkEngine::with_size_resolver(fast_config(2), sizes).unwrap();
    let backend = ScriptedBackend::new("answer");

    let result = engine
        .run_benchmark(&backend, "mistral", QUESTION, Technique::Baseline, None)
        .await
        .unwrap();

    assert_eq!(result.successful_trials, 2);
    assert_eq!(result.metrics.model_size_mb, None);
}

#[tokio::test]
async fn test_faster_candidate_shows_positive_improvement() {
    test_setup!();
    let engine = test_engine(3);
    let slow = ScriptedBackend::new("the same answer text").with_latency(Duration::from_millis(40));
    let fast = ScriptedBackend::new("the same answer text").with_latency(Duration::from_millis(2));

    let before = engine
        .run_benchmark(&slow, "mistral", QUESTION, Technique::Baseline, None)
        .await
        .unwrap();
    let after = engine
        .run_benchmark(&fast, "mistral:7b-instruct-q4_0", QUESTION, Technique::Quantization, None)
        .await
        .unwrap();

    let improvement = engine.compare(&before.metrics, &after.metrics);
    assert!(improvement[&Metric::ResponseTime] > 0.0);
    assert!(improvement[&Metric::TokensPerSecond] > 0.0);
    // Both models list 4.1 GB
    assert!(improvement[&Metric::ModelSize].abs() < 1e-9);

    let json = serde_json::to_value(&improvement).unwrap();
    assert!(json["responseTime"].as_f64().unwrap() > 0.0);

    // The candidate run does not displace the baseline
    assert_eq!(engine.baseline().await, Some(before.metrics));
}

#[tokio::test]
async fn test_simulated_quantization_scales_measured_baseline() {
    let engine = test_engine(3);
    let backend = ScriptedBackend::new("answer");

    let baseline = engine
        .run_benchmark(&backend, "mistral", QUESTION, Technique::Baseline, None)
        .await
        .unwrap()
        .metrics;

    let result = engine
        .simulate_quantization(&backend, "mistral", QUESTION, QuantizationLevel::Q8_0)
        .await
        .unwrap();

    // Baseline reused, no further queries
    assert_eq!(backend.calls(), 4);
    assert!(result.is_synthetic());
    assert_eq!(result.model_name, "mistral-q8_0");
    assert_eq!(result.before_metrics, Some(baseline));
    assert!((result.metrics.response_time - baseline.response_time * 0.6).abs() < 1e-12);
    assert!((result.metrics.tokens_per_second - baseline.tokens_per_second * 1.5).abs() < 1e-9);
    assert!((result.metrics.model_size_mb.unwrap() - 4198.4 * 0.4).abs() < 1e-9);
    assert!((result.metrics.latency_p99.unwrap() - baseline.latency_p99.unwrap() * 0.7).abs() < 1e-9);

    let history = engine.history().await.history;
    assert_eq!(history.len(), 2);
    assert_eq!(history[1], result);
}

#[tokio::test]
async fn test_zero_ratio_pruning_changes_nothing() {
    let engine = test_engine(2);
    let backend = ScriptedBackend::new("answer");

    let result = engine
        .simulate_pruning(&backend, "mistral", QUESTION, 0.0)
        .await
        .unwrap();

    let before = result.before_metrics.unwrap();
    assert_eq!(result.metrics, before);
    assert_eq!(result.model_name, "mistral-pruned-0%");
    for pct in result.improvement_percent.unwrap().values() {
        assert_eq!(*pct, 0.0);
    }
}

#[tokio::test]
async fn test_out_of_range_ratio_is_rejected() {
    let engine = test_engine(2);
    let backend = ScriptedBackend::new("answer");

    let err = engine
        .simulate_pruning(&backend, "mistral", QUESTION, -0.1)
        .await
        .unwrap_err();

    assert!(matches!(err, BenchError::InvalidRatio(_)));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_share_one_ledger() {
    test_setup!();
    let engine = test_engine(2);
    let backends: Vec<ScriptedBackend> = (0..8).map(|_| ScriptedBackend::new("answer")).collect();
    let names: Vec<String> = (0..8).map(|i| format!("model-{}", i)).collect();

    let runs = backends.iter().zip(&names).map(|(backend, name)| {
        engine.run_benchmark(backend, name, QUESTION, Technique::Quantization, None)
    });
    let results = join_all(runs).await;

    assert!(results.iter().all(|r| r.is_ok()));

    let mut recorded: Vec<String> = engine
        .history()
        .await
        .history
        .into_iter()
        .map(|r| r.model_name)
        .collect();
    assert_eq!(recorded.len(), 8);
    recorded.sort();
    let mut expected = names.clone();
    expected.sort();
    assert_eq!(recorded, expected);
}
