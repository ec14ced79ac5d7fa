use std::path::Path;

use fraudlab_adapter_artifacts::TransactionTable;
use fraudlab_application::{
    SyntheticSpec, TrainModes, run_anomaly_scoring, run_etl, run_training, synthesize_raw,
};
use fraudlab_domain::schema::{ANOMALY_FLAG, FRAUD_PRED, FRAUD_PROB};
use fraudlab_domain::{FraudlabConfig, MetricsReport};
use tempfile::tempdir;

const BOTH: TrainModes = TrainModes {
    train: true,
    evaluate: true,
};

fn prepare(base: &Path, spec: &SyntheticSpec) -> FraudlabConfig {
    let config = FraudlabConfig::rooted_at(base);
    synthesize_raw(&config, spec).unwrap();
    run_etl(&config).unwrap();
    config
}

fn read_metrics(config: &FraudlabConfig) -> MetricsReport {
    let body = std::fs::read_to_string(config.artifacts().metrics_json()).unwrap();
    serde_json::from_str(&body).unwrap()
}

#[test]
fn pipeline_catches_high_amount_fraud() {
    let dir = tempdir().unwrap();
    let config = prepare(dir.path(), &SyntheticSpec::default());

    let outcome = run_training(&config, BOTH).unwrap();
    let report = read_metrics(&config);
    assert_eq!(Some(&report), outcome.report.as_ref());
    assert!(report.recall >= 0.8, "{report:?}");
    assert_eq!(report.total(), 300);
    assert!((0.0..=1.0).contains(&report.roc_auc));
    assert!((0.0..=1.0).contains(&report.pr_auc));
    assert!((report.positive_rate_test - 9.0 / 300.0).abs() < 1e-12);

    let predictions = TransactionTable::read_csv(&config.artifacts().predictions_csv()).unwrap();
    assert_eq!(predictions.height(), 300);
    let probabilities = predictions.numeric_column(FRAUD_PROB).unwrap();
    let decisions = predictions.numeric_column(FRAUD_PRED).unwrap();
    for (p, d) in probabilities.iter().zip(&decisions) {
        assert!((0.0..=1.0).contains(p));
        assert_eq!(*d, if *p >= 0.5 { 1.0 } else { 0.0 });
    }
}

#[test]
fn retraining_on_identical_inputs_is_byte_identical() {
    let dir = tempdir().unwrap();
    let config = prepare(dir.path(), &SyntheticSpec::default());
    let metrics = config.artifacts().metrics_json();

    run_training(&config, BOTH).unwrap();
    let first = std::fs::read(&metrics).unwrap();
    run_training(&config, BOTH).unwrap();
    let second = std::fs::read(&metrics).unwrap();
    assert_eq!(first, second);
}

#[test]
fn separable_amount_threshold_is_near_perfect() {
    let dir = tempdir().unwrap();
    let spec = SyntheticSpec {
        fraud_rate: 0.2,
        fraud_amount_floor: 1000.0,
        ..SyntheticSpec::default()
    };
    let config = prepare(dir.path(), &spec);

    let report = run_training(&config, BOTH).unwrap().report.unwrap();
    assert!(report.precision >= 0.95, "{report:?}");
    assert!(report.recall >= 0.95, "{report:?}");
}

#[test]
fn anomaly_scoring_flags_roughly_the_contamination_share() {
    let dir = tempdir().unwrap();
    let config = prepare(dir.path(), &SyntheticSpec::default());

    let outcome = run_anomaly_scoring(&config).unwrap();
    let fraction = outcome.flagged as f64 / outcome.rows as f64;
    assert!((0.01..=0.05).contains(&fraction), "{fraction}");

    let scored = TransactionTable::read_csv(&outcome.output_path).unwrap();
    let flags = scored.numeric_column(ANOMALY_FLAG).unwrap();
    assert_eq!(flags.len(), 1000);
}

#[test]
fn shipped_config_parses_with_documented_defaults() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/config.yaml");
    let config = FraudlabConfig::load_from_path(&path).unwrap();
    assert_eq!(config.etl.test_fraction, 0.3);
    assert_eq!(config.anomaly.n_estimators, 200);
    assert_eq!(config.anomaly.contamination, 0.025);
    assert_eq!(config.schedule.retries, 1);
    assert_eq!(config.schedule.retry_delay_secs, 300);
    assert!(config.schedule.bin_dir.is_none());
}
