//! Feature build: raw transactions → `features.csv`, `train.csv`, `test.csv`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{Timelike, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use fraudlab_adapter_artifacts::{TransactionTable, writer};
use fraudlab_domain::schema::{AMOUNT, HOUR_OF_DAY, LOG_AMOUNT};
use fraudlab_domain::{FeatureSnapshot, FeatureSummary, FraudlabConfig};
use fraudlab_ml::select_features;

use crate::synthetic::{self, SyntheticSpec};

#[derive(Debug, Clone)]
pub struct EtlOutcome {
    pub features_path: PathBuf,
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub snapshot_path: PathBuf,
    pub rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Writes a synthetic raw transaction table to the configured raw path.
pub fn synthesize_raw(config: &FraudlabConfig, spec: &SyntheticSpec) -> Result<PathBuf> {
    let path = config.artifacts().raw_transactions();
    let records = synthetic::generate(spec);
    let mut table = TransactionTable::from_records(&records)?;
    table.write_csv(&path)?;
    tracing::info!("Wrote {} synthetic transactions to {}", records.len(), path.display());
    Ok(path)
}

pub fn run_etl(config: &FraudlabConfig) -> Result<EtlOutcome> {
    let paths = config.artifacts();
    let raw_path = paths.raw_transactions();
    let mut table = TransactionTable::load(&raw_path)
        .with_context(|| format!("loading raw transactions from {}", raw_path.display()))?;

    let hours = table
        .timestamps()?
        .into_iter()
        .map(|ts| i64::from(ts.hour()))
        .collect();
    let log_amounts = table
        .numeric_column(AMOUNT)?
        .into_iter()
        .map(|a| a.max(0.0).ln_1p())
        .collect();
    table.with_i64_column(HOUR_OF_DAY, hours)?;
    table.with_f64_column(LOG_AMOUNT, log_amounts)?;

    let labels = table.labels()?;
    let (train_rows, test_rows) = stratified_split(&labels, config.etl.test_fraction, config.etl.seed);
    let mut train = table.take_rows(&train_rows)?;
    let mut test = table.take_rows(&test_rows)?;

    let features = select_features(&table.column_names(), config.features.policy)?;
    let summaries = features
        .names()
        .iter()
        .map(|name| Ok(summarize(name, &table.numeric_column(name)?)))
        .collect::<Result<Vec<_>>>()?;
    let positives = labels.iter().filter(|&&l| l).count();
    let snapshot = FeatureSnapshot {
        generated_at: Utc::now().to_rfc3339(),
        rows: table.height(),
        train_rows: train_rows.len(),
        test_rows: test_rows.len(),
        fraud_rate: positives as f64 / labels.len().max(1) as f64,
        features: summaries,
    };

    let outcome = EtlOutcome {
        features_path: paths.features_csv(),
        train_path: paths.train_csv(),
        test_path: paths.test_csv(),
        snapshot_path: paths.feature_snapshot_json(),
        rows: table.height(),
        train_rows: train_rows.len(),
        test_rows: test_rows.len(),
    };
    table.write_csv(&outcome.features_path)?;
    train.write_csv(&outcome.train_path)?;
    test.write_csv(&outcome.test_path)?;
    writer::write_json(&outcome.snapshot_path, &snapshot)?;

    tracing::info!(
        rows = outcome.rows,
        train_rows = outcome.train_rows,
        test_rows = outcome.test_rows,
        features = features.len(),
        "feature build complete"
    );
    Ok(outcome)
}

/// Splits row indices per label so both splits keep the fraud rate.
/// Each class contributes `round(len * test_fraction)` rows to the test split;
/// both index lists come back in ascending (original) order.
pub fn stratified_split(labels: &[bool], test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();
    for class in [false, true] {
        let mut rows: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == class).collect();
        rows.shuffle(&mut rng);
        let n_test = ((rows.len() as f64) * test_fraction).round() as usize;
        test.extend_from_slice(&rows[..n_test]);
        train.extend_from_slice(&rows[n_test..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

fn summarize(name: &str, values: &[f64]) -> FeatureSummary {
    let n = values.len().max(1) as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    FeatureSummary {
        name: name.to_string(),
        mean,
        std: variance.sqrt(),
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fraudlab_domain::PipelineError;
    use tempfile::tempdir;

    #[test]
    fn split_is_stratified_disjoint_and_ordered() {
        let labels: Vec<bool> = (0..1000).map(|i| i % 100 < 3).collect();
        let (train, test) = stratified_split(&labels, 0.3, 42);
        assert_eq!(test.len(), 300);
        assert_eq!(train.len(), 700);
        assert_eq!(test.iter().filter(|&&i| labels[i]).count(), 9);
        assert!(test.windows(2).all(|w| w[0] < w[1]));
        assert!(train.iter().all(|i| !test.contains(i)));
    }

    #[test]
    fn split_depends_only_on_seed() {
        let labels: Vec<bool> = (0..200).map(|i| i % 10 == 0).collect();
        assert_eq!(
            stratified_split(&labels, 0.3, 7),
            stratified_split(&labels, 0.3, 7)
        );
    }

    #[test]
    fn builds_feature_tables_from_raw() {
        let dir = tempdir().unwrap();
        let config = FraudlabConfig::rooted_at(dir.path());
        synthesize_raw(&config, &SyntheticSpec::default().with_rows(200)).unwrap();

        let outcome = run_etl(&config).unwrap();
        assert_eq!(outcome.rows, 200);
        assert_eq!(outcome.train_rows + outcome.test_rows, 200);

        let features = TransactionTable::load(&outcome.features_path).unwrap();
        assert!(features.has_column(HOUR_OF_DAY));
        assert!(features.has_column(LOG_AMOUNT));
        let test = TransactionTable::load(&outcome.test_path).unwrap();
        assert_eq!(test.height(), outcome.test_rows);

        let snapshot: FeatureSnapshot =
            serde_json::from_str(&std::fs::read_to_string(&outcome.snapshot_path).unwrap())
                .unwrap();
        let names: Vec<&str> = snapshot.features.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            ["amount", "merchant_risk", "txn_count_24h", "hour_of_day", "log_amount"]
        );
    }

    #[test]
    fn missing_raw_input_is_fatal() {
        let dir = tempdir().unwrap();
        let config = FraudlabConfig::rooted_at(dir.path());
        let err = run_etl(&config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::InputNotFound { .. })
        ));
    }
}
