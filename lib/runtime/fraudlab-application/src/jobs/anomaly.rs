//! Label-blind isolation-forest scoring over `features.csv`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use linfa::DatasetBase;
use linfa::traits::Fit;

use fraudlab_adapter_artifacts::TransactionTable;
use fraudlab_domain::schema::{ANOMALY_FLAG, ANOMALY_SCORE, OUTPUT_KEY_COLUMNS};
use fraudlab_domain::{FraudlabConfig, PipelineError};
use fraudlab_ml::{IsolationForestParams, select_features};

#[derive(Debug, Clone)]
pub struct ScoreOutcome {
    pub output_path: PathBuf,
    pub rows: usize,
    pub flagged: usize,
}

pub fn run_anomaly_scoring(config: &FraudlabConfig) -> Result<ScoreOutcome> {
    let paths = config.artifacts();
    let path = paths.features_csv();
    let table = TransactionTable::load(&path)
        .with_context(|| format!("loading feature table {}", path.display()))?;
    let features = select_features(&table.column_names(), config.features.policy)?;
    let records = table.feature_matrix(features.names())?;

    let dataset = DatasetBase::new(records, ());

    let forest = IsolationForestParams::from(&config.anomaly)
        .fit(&dataset)
        .map_err(PipelineError::from)?;
    // The label column is carried through to the output, never read.
    let scores = forest
        .flag_and_score(dataset.records.view())
        .map_err(PipelineError::from)?;
    let flagged = scores.flagged();

    let mut output = table.project(&OUTPUT_KEY_COLUMNS)?;
    output.with_i64_column(ANOMALY_FLAG, scores.flags.iter().map(|&f| i64::from(f)).collect())?;
    output.with_f64_column(ANOMALY_SCORE, scores.scores)?;
    let output_path = paths.anomaly_scores_csv();
    output.write_csv(&output_path)?;

    tracing::info!(
        "Scored {} rows, {} flagged (offset {:.4})",
        table.height(),
        flagged,
        forest.offset()
    );
    Ok(ScoreOutcome {
        output_path,
        rows: table.height(),
        flagged,
    })
}
