//! Error types for qsim

use thiserror::Error;

pub type Result<T> = std::result::Result<T, QsError>;

#[derive(Error, Debug)]
pub enum QsError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Record {id} skipped during vectorization: {reason}")]
    VectorizationSkipped { id: String, reason: String },

    #[error("Search cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("Invalid scoring weights: {0}")]
    InvalidWeights(String),

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    #[error("Import failed: {0}")]
    Import(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl QsError {
    /// Stable machine-readable code used in robot output and API envelopes.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::VectorizationSkipped { .. } => "vectorization_skipped",
            Self::CacheUnavailable(_) => "cache_unavailable",
            Self::InvalidWeights(_) => "invalid_weights",
            Self::DimensionMismatch { .. } => "dimension_mismatch",
            Self::Config(_) => "config_error",
            Self::MissingConfig(_) => "missing_config",
            Self::Import(_) => "import_failed",
            Self::Io(_) => "io_error",
            Self::Serialization(_) => "serialization_error",
        }
    }

    /// Whether the caller supplied bad input (as opposed to an environment failure).
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_) | Self::VectorizationSkipped { .. } | Self::InvalidWeights(_)
        )
    }
}
