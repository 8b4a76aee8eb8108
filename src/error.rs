//! Error types for the bot detection pipeline

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, DetectorError>;

/// Main error type for the bot detection pipeline
#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Dataset not found: {}", path.display())]
    DatasetNotFound { path: PathBuf },

    #[error("Dataset is empty: {}", path.display())]
    EmptyCorpus { path: PathBuf },

    #[error("Missing field '{field}' in {corpus} corpus record {index}")]
    MissingField {
        corpus: String,
        field: String,
        index: usize,
    },

    #[error("Invalid record {index} in {corpus} corpus: {reason}")]
    InvalidRecord {
        corpus: String,
        index: usize,
        reason: String,
    },

    #[error("Failed to load artifact {}: {reason}", path.display())]
    ArtifactLoad { path: PathBuf, reason: String },

    #[error("Failed to write artifact {}: {reason}", path.display())]
    ArtifactWrite { path: PathBuf, reason: String },

    #[error("Model not fitted")]
    NotFitted,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Training error: {0}")]
    TrainingError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<polars::error::PolarsError> for DetectorError {
    fn from(err: polars::error::PolarsError) -> Self {
        DetectorError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for DetectorError {
    fn from(err: serde_json::Error) -> Self {
        DetectorError::SerializationError(err.to_string())
    }
}

impl From<bincode::Error> for DetectorError {
    fn from(err: bincode::Error) -> Self {
        DetectorError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for DetectorError {
    fn from(err: ndarray::ShapeError) -> Self {
        DetectorError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}
