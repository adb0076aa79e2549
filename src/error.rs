//! Error types for the fusion pipeline

use thiserror::Error;

/// Result type alias for fusion operations
pub type Result<T> = std::result::Result<T, FusionError>;

/// Main error type for the fusion pipeline
#[derive(Error, Debug)]
pub enum FusionError {
    #[error("Column '{column}' has no non-missing training values")]
    AllMissingColumn { column: String },

    #[error("Schema mismatch: expected {expected}, got {actual}")]
    SchemaMismatch { expected: String, actual: String },

    #[error("Label alignment error: {rows} feature rows but {labels} labels")]
    LabelAlignment { rows: usize, labels: usize },

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Degenerate class set: only label {label} present in {n_samples} samples")]
    DegenerateClass { label: f64, n_samples: usize },

    #[error("Label {value} at row {index} is not a binary class (expected 0 or 1)")]
    NonBinaryLabel { index: usize, value: f64 },

    #[error("Duplicate feature name: {0}")]
    DuplicateFeature(String),

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Modality '{modality}' failed: {source}")]
    Modality {
        modality: String,
        #[source]
        source: Box<FusionError>,
    },

    #[error("Candidate C={c:e} failed: {source}")]
    Candidate {
        c: f64,
        #[source]
        source: Box<FusionError>,
    },
}

impl FusionError {
    /// Attribute an error to the named modality
    pub fn in_modality(self, modality: impl Into<String>) -> Self {
        FusionError::Modality {
            modality: modality.into(),
            source: Box::new(self),
        }
    }

    /// Attribute an error to a sweep candidate
    pub fn in_candidate(self, c: f64) -> Self {
        FusionError::Candidate {
            c,
            source: Box::new(self),
        }
    }
}

impl From<polars::error::PolarsError> for FusionError {
    fn from(err: polars::error::PolarsError) -> Self {
        FusionError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for FusionError {
    fn from(err: serde_json::Error) -> Self {
        FusionError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for FusionError {
    fn from(err: ndarray::ShapeError) -> Self {
        FusionError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
