//! Error types for the penguin inference service

use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, PenguinError>;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum PenguinError {
    #[error("Data error: {0}")]
    Data(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Artifact load error: {0}")]
    Artifact(String),

    #[error("Predicted class index {index} out of range for label table of length {len}")]
    LabelOutOfRange { index: usize, len: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<polars::error::PolarsError> for PenguinError {
    fn from(err: polars::error::PolarsError) -> Self {
        PenguinError::Data(err.to_string())
    }
}

impl From<ndarray::ShapeError> for PenguinError {
    fn from(err: ndarray::ShapeError) -> Self {
        PenguinError::Data(err.to_string())
    }
}
