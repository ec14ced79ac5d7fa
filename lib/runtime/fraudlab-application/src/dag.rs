//! The daily graph: `etl_build_features` → {`train_eval`, `unsupervised_anomaly`}.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use fraudlab_domain::schedule::{ANOMALY_TASK, ETL_TASK, TRAIN_TASK};
use fraudlab_domain::{DagRun, FraudlabConfig, RetryPolicy, TaskSpec, TaskStatus};
use fraudlab_ports::TaskExecutor;

pub const ETL_BIN: &str = "etl-pipeline";
pub const TRAIN_BIN: &str = "model-train";
pub const ANOMALY_BIN: &str = "anomaly-detection";

#[derive(Debug, Clone)]
pub struct DailyDag {
    etl: TaskSpec,
    train: TaskSpec,
    anomaly: TaskSpec,
    retry: RetryPolicy,
}

impl DailyDag {
    pub fn new(etl: TaskSpec, train: TaskSpec, anomaly: TaskSpec, retry: RetryPolicy) -> Self {
        Self {
            etl,
            train,
            anomaly,
            retry,
        }
    }

    /// Wires the three job binaries found in `bin_dir`, each pointed at the
    /// same config file.
    pub fn from_config(config: &FraudlabConfig, config_path: &Path, bin_dir: &Path) -> Self {
        let config_arg = config_path.display().to_string();
        let bin = |name: &str| bin_dir.join(format!("{name}{}", std::env::consts::EXE_SUFFIX));
        Self::new(
            TaskSpec::new(ETL_TASK, bin(ETL_BIN), &["--config", &config_arg, "--run-all"]),
            TaskSpec::new(
                TRAIN_TASK,
                bin(TRAIN_BIN),
                &["--config", &config_arg, "--train", "--eval"],
            ),
            TaskSpec::new(
                ANOMALY_TASK,
                bin(ANOMALY_BIN),
                &["--config", &config_arg, "--score"],
            ),
            RetryPolicy {
                retries: config.schedule.retries,
                delay: Duration::from_secs(config.schedule.retry_delay_secs),
            },
        )
    }

    pub fn tasks(&self) -> [&TaskSpec; 3] {
        [&self.etl, &self.train, &self.anomaly]
    }

    /// Triggers one run. Downstream nodes start only after ETL succeeds and
    /// then run concurrently; neither waits on the other.
    pub async fn run(&self, executor: &dyn TaskExecutor) -> DagRun {
        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        tracing::info!("Starting DAG run {}", run_id);

        let mut statuses = BTreeMap::new();
        let etl = self.run_task(executor, &self.etl).await;
        if etl.is_success() {
            let (train, anomaly) = tokio::join!(
                self.run_task(executor, &self.train),
                self.run_task(executor, &self.anomaly)
            );
            statuses.insert(self.train.id.clone(), train);
            statuses.insert(self.anomaly.id.clone(), anomaly);
        } else {
            statuses.insert(self.train.id.clone(), TaskStatus::UpstreamFailed);
            statuses.insert(self.anomaly.id.clone(), TaskStatus::UpstreamFailed);
        }
        statuses.insert(self.etl.id.clone(), etl);

        let run = DagRun {
            run_id,
            started_at,
            statuses,
        };
        tracing::info!(
            "DAG run {} finished (succeeded: {}): {:?}",
            run.run_id,
            run.succeeded(),
            run.statuses
        );
        run
    }

    async fn run_task(&self, executor: &dyn TaskExecutor, task: &TaskSpec) -> TaskStatus {
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 1;
        loop {
            tracing::info!("Executing task {} (attempt {}/{})", task.id, attempt, max_attempts);
            match executor.execute(task).await {
                Ok(()) => {
                    tracing::info!("Task {} succeeded", task.id);
                    return TaskStatus::Succeeded { attempts: attempt };
                }
                Err(e) if attempt < max_attempts => {
                    tracing::warn!(
                        "Task {} failed: {:#}; retrying in {}s",
                        task.id,
                        e,
                        self.retry.delay.as_secs()
                    );
                    tokio::time::sleep(self.retry.delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!("Task {} failed after {} attempts: {:#}", task.id, attempt, e);
                    return TaskStatus::Failed {
                        attempts: attempt,
                        error: format!("{e:#}"),
                    };
                }
            }
        }
    }
}
