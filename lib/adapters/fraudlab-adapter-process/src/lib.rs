//! Runs DAG nodes as child processes.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tokio::process::Command;

use fraudlab_domain::TaskSpec;
use fraudlab_ports::TaskExecutor;

/// Spawns the task's program and waits for it; a non-zero exit is a failure.
#[derive(Debug, Clone, Default)]
pub struct ProcessExecutor;

impl ProcessExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TaskExecutor for ProcessExecutor {
    async fn execute(&self, task: &TaskSpec) -> Result<()> {
        tracing::info!("Spawning {} for task {}", task.program.display(), task.id);
        tracing::debug!(args = ?task.args, "task arguments");
        let status = Command::new(&task.program)
            .args(&task.args)
            .kill_on_drop(true)
            .status()
            .await
            .with_context(|| format!("failed to spawn {}", task.program.display()))?;
        if !status.success() {
            bail!("task {} exited with {status}", task.id);
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn zero_exit_succeeds() {
        let task = TaskSpec::new("ok", "sh", &["-c", "exit 0"]);
        ProcessExecutor::new().execute(&task).await.unwrap();
    }

    #[tokio::test]
    async fn non_zero_exit_fails() {
        let task = TaskSpec::new("broken", "sh", &["-c", "exit 3"]);
        let err = ProcessExecutor::new().execute(&task).await.unwrap_err();
        assert!(err.to_string().contains("broken"), "{err}");
    }

    #[tokio::test]
    async fn missing_program_fails() {
        let task = TaskSpec::new("ghost", "/nonexistent/fraudlab-job", &[]);
        assert!(ProcessExecutor::new().execute(&task).await.is_err());
    }
}
