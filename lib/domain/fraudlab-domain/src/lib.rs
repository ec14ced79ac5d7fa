//! Domain models shared by the fraudlab batch jobs.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod schedule;
pub mod schema;

pub use artifacts::{
    ArtifactPaths, FeatureSnapshot, FeatureSummary, MODEL_NAME, MetricsReport, TransactionRecord,
};
pub use config::{
    AnomalyConfig, DEFAULT_CONFIG_PATH, EtlConfig, FeaturesConfig, FraudlabConfig, PathsConfig,
    ScheduleConfig, SelectionPolicy, TrainingConfig,
};
pub use error::{PipelineError, Result};
pub use schedule::{DagRun, RetryPolicy, TaskId, TaskSpec, TaskStatus};
