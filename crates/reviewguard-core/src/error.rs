//! Error types for ReviewGuard

/// Result type alias using ReviewGuard's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for ReviewGuard operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Review text was not valid UTF-8
    #[error("encoding error at byte {offset}: {message}")]
    Encoding { offset: usize, message: String },

    /// A prediction was requested before a model bundle was loaded
    #[error("no model bundle loaded")]
    ModelNotLoaded,

    /// Feature vector width disagrees with what the models were fit on
    #[error("feature dimension mismatch: expected {expected}, got {actual}")]
    FeatureDimensionMismatch { expected: usize, actual: usize },

    /// One ensemble member failed while scoring
    #[error("model '{model}' failed to score: {message}")]
    ModelScoring { model: String, message: String },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// Filesystem errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new encoding error
    pub fn encoding(offset: usize, msg: impl Into<String>) -> Self {
        Self::Encoding {
            offset,
            message: msg.into(),
        }
    }

    /// Create a new dimension mismatch error
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::FeatureDimensionMismatch { expected, actual }
    }

    /// Create a new model scoring error
    pub fn model_scoring(model: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::ModelScoring {
            model: model.into(),
            message: msg.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Short stable name of the error kind, used as a metric label
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Encoding { .. } => "encoding",
            Self::ModelNotLoaded => "model_not_loaded",
            Self::FeatureDimensionMismatch { .. } => "feature_dimension_mismatch",
            Self::ModelScoring { .. } => "model_scoring",
            Self::Config(_) => "config",
            Self::Io(_) => "io",
            Self::Serialization(_) => "serialization",
            Self::Internal(_) => "internal",
        }
    }
}
