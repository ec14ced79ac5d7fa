//! Models and metrics for the fraudlab batch jobs.

pub mod error;
pub mod features;
pub mod isolation;
mod linalg;
pub mod logistic;
pub mod metrics;

pub use error::MlError;
pub use features::{FeatureSet, select_features};
pub use isolation::{AnomalyScores, IsolationForest, IsolationForestParams};
pub use logistic::{LogisticModel, LogisticParams, balanced_class_weights};
pub use metrics::{BinaryMetrics, ConfusionMatrix, average_precision, evaluate, roc_auc};
