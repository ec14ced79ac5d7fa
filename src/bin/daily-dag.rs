use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;

use fraudlab::cli::{ConfigArgs, init_tracing};
use fraudlab_adapter_process::ProcessExecutor;
use fraudlab_application::DailyDag;

#[derive(Debug, Parser)]
#[command(name = "daily-dag", about = "Trigger one run of the daily fraud pipeline")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.config.load()?;

    let bin_dir = match &config.schedule.bin_dir {
        Some(dir) => dir.clone(),
        None => sibling_dir()?,
    };
    let dag = DailyDag::from_config(&config, &cli.config.config, &bin_dir);
    let run = dag.run(&ProcessExecutor::new()).await;

    if !run.succeeded() {
        bail!("dag run {} failed: {:?}", run.run_id, run.statuses);
    }
    println!(
        "[OK] dag run {}: {}",
        run.run_id,
        config.artifacts().reports_dir().display()
    );
    Ok(())
}

/// Job binaries are installed next to this one by default.
fn sibling_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().context("resolving current executable")?;
    exe.parent()
        .map(|p| p.to_path_buf())
        .context("current executable has no parent directory")
}
