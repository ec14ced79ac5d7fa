use std::path::PathBuf;

/// Failures shared by every batch job.
///
/// All variants are fatal for the job that raises them; retries happen
/// outside the process, at the orchestration layer.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Config file missing, unparseable, or missing a required key.
    #[error("configuration error: {0}")]
    Config(String),

    /// An expected input table does not exist.
    #[error("input not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    /// A table does not have the shape the job relies on.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    /// The estimator could not be fitted or evaluated on the given data.
    #[error("model fit failed: {0}")]
    ModelFit(String),

    #[error("io error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error raised by the CSV/table engine.
    #[error("table error: {0}")]
    Table(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn schema(message: impl Into<String>) -> Self {
        Self::SchemaMismatch(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
