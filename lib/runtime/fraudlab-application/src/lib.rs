pub mod dag;
pub mod jobs;
pub mod synthetic;

pub use dag::DailyDag;
pub use jobs::{
    EtlOutcome, ScoreOutcome, TrainModes, TrainOutcome, run_anomaly_scoring, run_etl,
    run_training, synthesize_raw,
};
pub use synthetic::SyntheticSpec;
