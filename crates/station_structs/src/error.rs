use thiserror::Error;

/// Boxed source error for failures coming from storage or codec crates.
pub type BoxError = Box<dyn core::error::Error + Send + Sync + 'static>;

/// Errors raised by the ingest, training and serving pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// An input dataset has not been written yet.
    #[error("Data not found at {path}. {hint}")]
    DataNotFound { path: String, hint: &'static str },

    /// A dataset or request does not have the expected structure.
    #[error("Schema error: {0}")]
    Schema(String),

    /// No trained model bundle is available.
    #[error("Model artifact missing at {path}. Run the training pipeline first.")]
    ArtifactMissing { path: String },

    /// The external data source failed or returned nothing usable.
    #[error("Upstream data source error: {0}")]
    Upstream(String),

    /// Writing the prediction log failed.
    #[error("Prediction log write failed: {0}")]
    Logging(String),

    /// Reading or writing persisted data failed.
    #[error("{context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: BoxError,
    },

    /// Model construction, serialization or inference failed.
    #[error("Model error: {0}")]
    Model(String),
}

impl PipelineError {
    /// Wraps a storage-layer error with a description of what was attempted.
    pub fn storage<E>(context: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Storage {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Returns true for errors that mean no model can be served.
    #[must_use]
    pub const fn is_unavailable(&self) -> bool {
        matches!(self, Self::ArtifactMissing { .. })
    }
}

/// Result alias used across the pipeline crates.
pub type PipelineResult<T> = Result<T, PipelineError>;
