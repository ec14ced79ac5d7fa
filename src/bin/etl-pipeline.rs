use anyhow::Result;
use clap::Parser;

use fraudlab::cli::{ConfigArgs, init_tracing};
use fraudlab_application::{SyntheticSpec, run_etl, synthesize_raw};

#[derive(Debug, Parser)]
#[command(name = "etl-pipeline", about = "Build model features from raw transactions")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    /// Build features.csv plus the train/test split and feature snapshot.
    #[arg(long)]
    run_all: bool,

    /// Write N synthetic transactions to the raw input before anything else.
    #[arg(long, value_name = "N")]
    synthesize: Option<usize>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.config.load()?;

    if let Some(rows) = cli.synthesize {
        let path = synthesize_raw(&config, &SyntheticSpec::default().with_rows(rows))?;
        println!("[OK] synthetic transactions: {}", path.display());
    }
    if cli.run_all {
        let outcome = run_etl(&config)?;
        println!("[OK] features: {}", outcome.features_path.display());
        println!("[OK] train split: {}", outcome.train_path.display());
        println!("[OK] test split: {}", outcome.test_path.display());
        println!("[OK] feature snapshot: {}", outcome.snapshot_path.display());
    }
    if cli.synthesize.is_none() && !cli.run_all {
        tracing::warn!("nothing to do: pass --run-all and/or --synthesize N");
    }
    Ok(())
}
