//! Error types for the vision pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for vision operations.
pub type VisionResult<T> = Result<T, VisionError>;

/// Errors that can occur while decoding, detecting or classifying.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Invalid image data: {0}")]
    Decode(String),

    #[error("Malformed data URI: {0}")]
    InvalidDataUri(String),

    #[error("Invalid base64 payload: {0}")]
    InvalidBase64(String),

    #[error("Invalid face region: {0}")]
    InvalidRegion(String),

    #[error("Face detection failed: {0}")]
    Detection(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Model not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("Failed to load model {}: {message}", .path.display())]
    ModelLoad { path: PathBuf, message: String },

    #[error("Face detector unavailable: {0}")]
    DetectorUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl VisionError {
    /// Create a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Create a detection failure error.
    pub fn detection(message: impl Into<String>) -> Self {
        Self::Detection(message.into())
    }

    /// Create an inference failure error.
    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference(message.into())
    }

    /// Create a model load error.
    pub fn model_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ModelLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// True when the error was caused by the caller's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Decode(_) | Self::InvalidDataUri(_) | Self::InvalidBase64(_)
        )
    }
}
