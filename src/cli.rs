use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing_subscriber::EnvFilter;

use fraudlab_domain::FraudlabConfig;
use fraudlab_domain::config::DEFAULT_CONFIG_PATH;

/// Logs go to stderr; stdout is reserved for the `[OK]` confirmation lines.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[derive(Debug, Clone, Args)]
pub struct ConfigArgs {
    /// Path to the pipeline YAML config.
    #[arg(long, env = "FRAUDLAB_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}

impl ConfigArgs {
    pub fn load(&self) -> Result<FraudlabConfig> {
        FraudlabConfig::load_from_path(&self.config)
            .with_context(|| format!("loading config {}", self.config.display()))
    }
}
