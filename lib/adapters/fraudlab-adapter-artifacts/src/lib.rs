//! Filesystem artifacts: CSV tables, JSON reports and model files.

pub mod model_store;
pub mod table;
pub mod writer;

pub use model_store::ModelStore;
pub use table::TransactionTable;

use fraudlab_domain::PipelineError;

pub(crate) fn table_err(err: polars::prelude::PolarsError) -> PipelineError {
    PipelineError::Table(err.to_string())
}
