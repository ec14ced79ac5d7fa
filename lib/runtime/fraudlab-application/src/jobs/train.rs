//! Supervised fraud classifier: fit on `train.csv`, evaluate on `test.csv`.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use linfa::DatasetBase;
use linfa::traits::Fit;
use ndarray::Array1;

use fraudlab_adapter_artifacts::{ModelStore, TransactionTable, writer};
use fraudlab_domain::schema::{FRAUD_PRED, FRAUD_PROB, OUTPUT_KEY_COLUMNS};
use fraudlab_domain::{FraudlabConfig, MODEL_NAME, MetricsReport, PipelineError};
use fraudlab_ml::{FeatureSet, LogisticModel, LogisticParams, evaluate, select_features};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrainModes {
    pub train: bool,
    pub evaluate: bool,
}

impl TrainModes {
    pub fn is_empty(&self) -> bool {
        !self.train && !self.evaluate
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrainOutcome {
    pub model_path: Option<PathBuf>,
    pub metrics_path: Option<PathBuf>,
    pub predictions_path: Option<PathBuf>,
    pub report: Option<MetricsReport>,
}

/// Predictions and report for one model, held until every phase succeeded.
struct Evaluation {
    report: MetricsReport,
    predictions: TransactionTable,
}

/// Runs the requested phases, then writes artifacts only once all of them
/// succeeded, so the model, metrics and predictions on disk always belong
/// together.
pub fn run_training(config: &FraudlabConfig, modes: TrainModes) -> Result<TrainOutcome> {
    let paths = config.artifacts();
    let store = ModelStore::new(&paths);
    let mut outcome = TrainOutcome::default();

    let fresh = if modes.train { Some(train(config)?) } else { None };

    let evaluation = if modes.evaluate {
        let evaluation = match &fresh {
            Some((model, features)) => evaluate_on_test(config, model, features)?,
            None => {
                let (model, names) = store.load::<LogisticModel>().with_context(|| {
                    format!("loading persisted model from {}", store.blob_path().display())
                })?;
                evaluate_on_test(config, &model, &FeatureSet::new(names))?
            }
        };
        Some(evaluation)
    } else {
        None
    };

    if let Some((model, features)) = &fresh {
        store.save(model, features.names())?;
        outcome.model_path = Some(store.blob_path().to_path_buf());
    }
    if let Some(Evaluation {
        report,
        mut predictions,
    }) = evaluation
    {
        predictions.write_csv(&paths.predictions_csv())?;
        writer::write_json(&paths.metrics_json(), &report)?;
        tracing::info!(
            "Evaluation written to {} (precision {:.3}, recall {:.3})",
            paths.metrics_json().display(),
            report.precision,
            report.recall
        );
        outcome.metrics_path = Some(paths.metrics_json());
        outcome.predictions_path = Some(paths.predictions_csv());
        outcome.report = Some(report);
    }

    Ok(outcome)
}

fn train(config: &FraudlabConfig) -> Result<(LogisticModel, FeatureSet)> {
    let path = config.artifacts().train_csv();
    let table = TransactionTable::load(&path)
        .with_context(|| format!("loading training table {}", path.display()))?;
    let features = select_features(&table.column_names(), config.features.policy)?;
    if features.is_empty() {
        bail!(PipelineError::ModelFit(
            "no feature columns left after exclusion".to_string()
        ));
    }

    let records = table.feature_matrix(features.names())?;
    let targets = Array1::from(table.labels()?);
    let dataset = DatasetBase::new(records, targets);
    let model = LogisticParams::from(&config.training)
        .fit(&dataset)
        .map_err(PipelineError::from)?;

    tracing::info!(
        rows = table.height(),
        features = features.len(),
        iterations = model.n_iter,
        "logistic regression fitted"
    );
    Ok((model, features))
}

fn evaluate_on_test(
    config: &FraudlabConfig,
    model: &LogisticModel,
    features: &FeatureSet,
) -> Result<Evaluation> {
    let path = config.artifacts().test_csv();
    let table = TransactionTable::load(&path)
        .with_context(|| format!("loading test table {}", path.display()))?;
    features.ensure_matches(&select_features(&table.column_names(), config.features.policy)?)?;

    let records = table.feature_matrix(features.names())?;
    let labels = table.labels()?;
    let probabilities = model.predict_proba(records.view()).map_err(PipelineError::from)?;
    let probabilities = probabilities.to_vec();
    let threshold = config.training.threshold;
    let metrics = evaluate(&labels, &probabilities, threshold).map_err(PipelineError::from)?;

    let report = MetricsReport {
        model: MODEL_NAME.to_string(),
        features_used: features.names().to_vec(),
        precision: metrics.precision,
        recall: metrics.recall,
        f1: metrics.f1,
        roc_auc: metrics.roc_auc,
        pr_auc: metrics.pr_auc,
        confusion_matrix: metrics.confusion.to_rows(),
        positive_rate_test: metrics.positive_rate,
    };

    let predictions = probabilities
        .iter()
        .map(|&p| i64::from(p >= threshold))
        .collect();
    let mut output = table.project(&OUTPUT_KEY_COLUMNS)?;
    output.with_f64_column(FRAUD_PROB, probabilities)?;
    output.with_i64_column(FRAUD_PRED, predictions)?;

    tracing::debug!(
        rows = labels.len(),
        roc_auc = report.roc_auc,
        pr_auc = report.pr_auc,
        "test split scored"
    );
    Ok(Evaluation {
        report,
        predictions: output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    use fraudlab_domain::{SelectionPolicy, TransactionRecord};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use tempfile::tempdir;

    use crate::synthetic::{self, SyntheticSpec};

    fn record(i: usize, amount: f64, fraud: bool) -> TransactionRecord {
        let mut row = synthetic::generate(&SyntheticSpec::default().with_rows(1))
            .pop()
            .unwrap();
        row.txn_id = format!("T{i}");
        row.amount = amount;
        row.merchant_risk = 0.5;
        row.txn_count_24h = 2;
        row.label_fraud = fraud;
        row
    }

    /// `label = amount > 1000`, split into fixed train/test tables.
    fn write_separable(config: &FraudlabConfig) {
        let paths = config.artifacts();
        let rows: Vec<_> = (0..400)
            .map(|i| {
                let amount = if i % 5 == 0 { 1500.0 + i as f64 } else { 10.0 + i as f64 };
                record(i, amount, amount > 1000.0)
            })
            .collect();
        let (train, test) = rows.split_at(280);
        write_table(&paths.train_csv(), train);
        write_table(&paths.test_csv(), test);
    }

    fn write_table(path: &Path, rows: &[TransactionRecord]) {
        TransactionTable::from_records(rows)
            .unwrap()
            .write_csv(path)
            .unwrap();
    }

    fn drop_column(path: &Path, column: &str) {
        let table = TransactionTable::load(path).unwrap();
        let names = table.column_names();
        let keep: Vec<&str> = names
            .iter()
            .map(String::as_str)
            .filter(|c| *c != column)
            .collect();
        table.project(&keep).unwrap().write_csv(path).unwrap();
    }

    const BOTH: TrainModes = TrainModes {
        train: true,
        evaluate: true,
    };

    #[test]
    fn separable_amount_rule_is_learned() {
        let dir = tempdir().unwrap();
        let config = FraudlabConfig::rooted_at(dir.path());
        write_separable(&config);

        let outcome = run_training(
            &config,
            TrainModes {
                train: true,
                evaluate: true,
            },
        )
        .unwrap();
        let report = outcome.report.unwrap();
        assert!(report.precision >= 0.95, "{report:?}");
        assert!(report.recall >= 0.95, "{report:?}");
        assert_eq!(report.total(), 120);
        assert_eq!(
            report.features_used,
            ["amount", "merchant_risk", "txn_count_24h"]
        );

        let predictions = TransactionTable::read_csv(&outcome.predictions_path.unwrap()).unwrap();
        assert_eq!(predictions.height(), 120);
        let mut expected: Vec<String> =
            OUTPUT_KEY_COLUMNS.iter().map(|c| c.to_string()).collect();
        expected.extend([FRAUD_PROB.to_string(), FRAUD_PRED.to_string()]);
        assert_eq!(predictions.column_names(), expected);
    }

    #[test]
    fn evaluation_alone_reloads_the_persisted_model() {
        let dir = tempdir().unwrap();
        let config = FraudlabConfig::rooted_at(dir.path());
        write_separable(&config);

        let trained = run_training(
            &config,
            TrainModes {
                train: true,
                evaluate: true,
            },
        )
        .unwrap();
        let first = std::fs::read(trained.metrics_path.unwrap()).unwrap();

        let reloaded = run_training(
            &config,
            TrainModes {
                train: false,
                evaluate: true,
            },
        )
        .unwrap();
        assert!(reloaded.model_path.is_none());
        let second = std::fs::read(reloaded.metrics_path.unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn single_class_training_labels_fail_to_fit() {
        let dir = tempdir().unwrap();
        let config = FraudlabConfig::rooted_at(dir.path());
        let rows: Vec<_> = (0..20).map(|i| record(i, 10.0 + i as f64, false)).collect();
        write_table(&config.artifacts().train_csv(), &rows);

        let err = run_training(
            &config,
            TrainModes {
                train: true,
                evaluate: false,
            },
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::ModelFit(_))
        ));
    }

    #[test]
    fn feature_drift_between_train_and_test_is_rejected() {
        let dir = tempdir().unwrap();
        let config = FraudlabConfig::rooted_at(dir.path());
        write_separable(&config);
        run_training(
            &config,
            TrainModes {
                train: true,
                evaluate: false,
            },
        )
        .unwrap();

        let test_path = config.artifacts().test_csv();
        let mut test = TransactionTable::load(&test_path).unwrap();
        let extra = vec![1.0; test.height()];
        test.with_f64_column("velocity", extra).unwrap();
        test.write_csv(&test_path).unwrap();

        let err = run_training(
            &config,
            TrainModes {
                train: false,
                evaluate: true,
            },
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::SchemaMismatch(_))
        ));
    }

    #[test]
    fn failed_evaluation_keeps_previous_artifacts() {
        let dir = tempdir().unwrap();
        let config = FraudlabConfig::rooted_at(dir.path());
        let paths = config.artifacts();
        write_separable(&config);
        run_training(&config, BOTH).unwrap();

        let artifacts = [
            paths.model_blob(),
            paths.feature_list(),
            paths.metrics_json(),
            paths.predictions_csv(),
        ];
        let before: Vec<Vec<u8>> = artifacts.iter().map(|p| std::fs::read(p).unwrap()).collect();

        // A different training set and a test split holding only legitimate rows.
        let train: Vec<_> = (0..200)
            .map(|i| {
                let amount = if i % 3 == 0 { 4000.0 + i as f64 } else { 50.0 + i as f64 };
                record(i, amount, amount > 1000.0)
            })
            .collect();
        write_table(&paths.train_csv(), &train);
        let test: Vec<_> = (0..50).map(|i| record(i, 20.0 + i as f64, false)).collect();
        write_table(&paths.test_csv(), &test);

        let err = run_training(&config, BOTH).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::ModelFit(_))
        ));
        let after: Vec<Vec<u8>> = artifacts.iter().map(|p| std::fs::read(p).unwrap()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn strict_policy_rejects_a_missing_exclusion_column() {
        let dir = tempdir().unwrap();
        let config = FraudlabConfig::rooted_at(dir.path());
        write_separable(&config);
        drop_column(&config.artifacts().train_csv(), "country");

        let err = run_training(&config, BOTH).unwrap_err();
        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::SchemaMismatch(msg)) => assert!(msg.contains("country"), "{msg}"),
            other => panic!("expected SchemaMismatch, got {other:?}"),
        }
        assert!(!config.artifacts().model_blob().exists());
    }

    #[test]
    fn lenient_policy_trains_without_an_exclusion_column() {
        let dir = tempdir().unwrap();
        let mut config = FraudlabConfig::rooted_at(dir.path());
        config.features.policy = SelectionPolicy::Lenient;
        write_separable(&config);
        drop_column(&config.artifacts().train_csv(), "country");
        drop_column(&config.artifacts().test_csv(), "country");

        let report = run_training(&config, BOTH).unwrap().report.unwrap();
        assert_eq!(
            report.features_used,
            ["amount", "merchant_risk", "txn_count_24h"]
        );
        assert_eq!(report.total(), 120);
    }

    #[test]
    fn label_independent_features_rank_at_chance() {
        let dir = tempdir().unwrap();
        let config = FraudlabConfig::rooted_at(dir.path());
        let mut rng = StdRng::seed_from_u64(17);
        let rows: Vec<_> = (0..4000)
            .map(|i| {
                let mut row = record(i, rng.gen_range(1.0..5000.0), rng.gen_bool(0.3));
                row.merchant_risk = rng.gen_range(0.0..1.0);
                row.txn_count_24h = rng.gen_range(0..10);
                row
            })
            .collect();
        let (train, test) = rows.split_at(2000);
        write_table(&config.artifacts().train_csv(), train);
        write_table(&config.artifacts().test_csv(), test);

        let report = run_training(&config, BOTH).unwrap().report.unwrap();
        assert!((report.roc_auc - 0.5).abs() < 0.06, "{}", report.roc_auc);
    }

    #[test]
    fn missing_training_table_is_reported() {
        let dir = tempdir().unwrap();
        let config = FraudlabConfig::rooted_at(dir.path());
        let err = run_training(
            &config,
            TrainModes {
                train: true,
                evaluate: false,
            },
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::InputNotFound { .. })
        ));
    }
}
