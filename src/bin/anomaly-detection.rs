use anyhow::Result;
use clap::Parser;

use fraudlab::cli::{ConfigArgs, init_tracing};
use fraudlab_application::run_anomaly_scoring;

#[derive(Debug, Parser)]
#[command(name = "anomaly-detection", about = "Label-blind isolation-forest scoring")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    /// Score features.csv into anomaly_scores.csv.
    #[arg(long)]
    score: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.config.load()?;

    if !cli.score {
        tracing::warn!("nothing to do: pass --score");
        return Ok(());
    }
    let outcome = run_anomaly_scoring(&config)?;
    println!(
        "[OK] anomaly scores ({} of {} flagged): {}",
        outcome.flagged,
        outcome.rows,
        outcome.output_path.display()
    );
    Ok(())
}
