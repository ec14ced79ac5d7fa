use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type TaskId = String;

pub const ETL_TASK: &str = "etl_build_features";
pub const TRAIN_TASK: &str = "train_eval";
pub const ANOMALY_TASK: &str = "unsupervised_anomaly";

/// One opaque external-process invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub id: TaskId,
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl TaskSpec {
    pub fn new(id: impl Into<TaskId>, program: impl Into<PathBuf>, args: &[&str]) -> Self {
        Self {
            id: id.into(),
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskStatus {
    Succeeded { attempts: u32 },
    Failed { attempts: u32, error: String },
    /// Not started because a dependency failed.
    UpstreamFailed,
}

impl TaskStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded { .. })
    }
}

/// Outcome of one trigger of the daily graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagRun {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub statuses: BTreeMap<TaskId, TaskStatus>,
}

impl DagRun {
    pub fn status(&self, task: &str) -> Option<&TaskStatus> {
        self.statuses.get(task)
    }

    pub fn succeeded(&self) -> bool {
        self.statuses.values().all(TaskStatus::is_success)
    }
}
