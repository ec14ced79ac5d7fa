//! Job entry points. Each takes the loaded configuration and turns typed
//! input artifacts into typed output artifacts.

pub mod anomaly;
pub mod etl;
pub mod train;

pub use anomaly::{ScoreOutcome, run_anomaly_scoring};
pub use etl::{EtlOutcome, run_etl, stratified_split, synthesize_raw};
pub use train::{TrainModes, TrainOutcome, run_training};
