use anyhow::Result;
use clap::Parser;

use fraudlab::cli::{ConfigArgs, init_tracing};
use fraudlab_application::{TrainModes, run_training};

#[derive(Debug, Parser)]
#[command(name = "model-train", about = "Train and evaluate the fraud classifier")]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    /// Fit on train.csv and persist the model.
    #[arg(long)]
    train: bool,

    /// Score test.csv, writing metrics.json and predictions.csv.
    #[arg(long = "eval")]
    evaluate: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.config.load()?;

    let modes = TrainModes {
        train: cli.train,
        evaluate: cli.evaluate,
    };
    if modes.is_empty() {
        tracing::warn!("nothing to do: pass --train and/or --eval");
        return Ok(());
    }

    let outcome = run_training(&config, modes)?;
    if let Some(path) = &outcome.model_path {
        println!("[OK] model: {}", path.display());
    }
    if let Some(path) = &outcome.metrics_path {
        println!("[OK] metrics: {}", path.display());
    }
    if let Some(path) = &outcome.predictions_path {
        println!("[OK] predictions: {}", path.display());
    }
    Ok(())
}
