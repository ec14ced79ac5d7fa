//! Seams between the orchestration runtime and its collaborators.

use anyhow::Result;
use async_trait::async_trait;

use fraudlab_domain::TaskSpec;

/// Runs a single DAG node to completion.
///
/// An `Err` means the attempt failed; the caller owns the retry decision.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, task: &TaskSpec) -> Result<()>;
}
