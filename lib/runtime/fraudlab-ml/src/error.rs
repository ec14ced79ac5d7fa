use fraudlab_domain::PipelineError;

#[derive(Debug, thiserror::Error)]
pub enum MlError {
    #[error("cannot fit on an empty dataset")]
    EmptyDataset,

    #[error("cannot fit without any feature columns")]
    NoFeatures,

    #[error("labels contain a single class (all {0})")]
    SingleClass(bool),

    #[error("{metric} is undefined when the labels contain a single class")]
    UndefinedMetric { metric: &'static str },

    #[error("model expects {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },

    #[error("{expected} labels expected, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Newton system is not positive definite")]
    Singular,

    #[error(transparent)]
    Linfa(#[from] linfa::error::Error),
}

impl From<MlError> for PipelineError {
    fn from(err: MlError) -> Self {
        match err {
            MlError::FeatureCount { .. } | MlError::LengthMismatch { .. } => {
                PipelineError::SchemaMismatch(err.to_string())
            }
            other => PipelineError::ModelFit(other.to_string()),
        }
    }
}
