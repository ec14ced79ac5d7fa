use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::config::PathsConfig;

pub const RAW_TRANSACTIONS: &str = "transactions.csv";
pub const FEATURES_CSV: &str = "features.csv";
pub const TRAIN_CSV: &str = "train.csv";
pub const TEST_CSV: &str = "test.csv";
pub const PREDICTIONS_CSV: &str = "predictions.csv";
pub const ANOMALY_SCORES_CSV: &str = "anomaly_scores.csv";
pub const METRICS_JSON: &str = "metrics.json";
pub const FEATURE_SNAPSHOT_JSON: &str = "feature_snapshot.json";
pub const MODEL_BLOB: &str = "logreg.json";
pub const FEATURE_LIST: &str = "features.txt";

/// Model name recorded in every metrics report.
pub const MODEL_NAME: &str = "logistic_regression_balanced";

/// Fixed artifact locations resolved against the configured directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    raw: PathBuf,
    processed: PathBuf,
    reports: PathBuf,
    models: PathBuf,
}

impl ArtifactPaths {
    pub fn from_paths(paths: &PathsConfig) -> Self {
        Self {
            raw: paths.raw.clone(),
            processed: paths.processed.clone(),
            reports: paths.reports.clone(),
            models: paths.models.clone(),
        }
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports
    }

    pub fn raw_transactions(&self) -> PathBuf {
        self.raw.join(RAW_TRANSACTIONS)
    }

    pub fn features_csv(&self) -> PathBuf {
        self.processed.join(FEATURES_CSV)
    }

    pub fn train_csv(&self) -> PathBuf {
        self.processed.join(TRAIN_CSV)
    }

    pub fn test_csv(&self) -> PathBuf {
        self.processed.join(TEST_CSV)
    }

    pub fn predictions_csv(&self) -> PathBuf {
        self.processed.join(PREDICTIONS_CSV)
    }

    pub fn anomaly_scores_csv(&self) -> PathBuf {
        self.processed.join(ANOMALY_SCORES_CSV)
    }

    pub fn metrics_json(&self) -> PathBuf {
        self.reports.join(METRICS_JSON)
    }

    pub fn feature_snapshot_json(&self) -> PathBuf {
        self.reports.join(FEATURE_SNAPSHOT_JSON)
    }

    pub fn model_blob(&self) -> PathBuf {
        self.models.join(MODEL_BLOB)
    }

    pub fn feature_list(&self) -> PathBuf {
        self.models.join(FEATURE_LIST)
    }
}

/// Evaluation outcome of one trained model. Field order is the order the
/// dashboards render.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsReport {
    pub model: String,
    pub features_used: Vec<String>,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub roc_auc: f64,
    pub pr_auc: f64,
    /// `[[tn, fp], [fn, tp]]`: rows are the true label, columns the prediction.
    pub confusion_matrix: [[u64; 2]; 2],
    pub positive_rate_test: f64,
}

impl MetricsReport {
    pub fn total(&self) -> u64 {
        self.confusion_matrix.iter().flatten().sum()
    }
}

/// One raw transaction as produced by the synthetic generator.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub txn_id: String,
    pub timestamp: NaiveDateTime,
    pub user_id: String,
    pub merchant_id: String,
    pub amount: f64,
    pub merchant_risk: f64,
    pub txn_count_24h: i64,
    pub device_type: String,
    pub country: String,
    pub label_fraud: bool,
}

/// Per-feature summary written by the ETL job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureSummary {
    pub name: String,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureSnapshot {
    pub generated_at: String,
    pub rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub fraud_rate: f64,
    pub features: Vec<FeatureSummary>,
}
