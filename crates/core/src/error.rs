//! Error types for the core domain.

use thiserror::Error;

/// Core domain error type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid file id: {0}")]
    InvalidFileId(String),

    #[error("invalid reference target: {0}")]
    InvalidReferenceTarget(String),

    #[error("configuration document exceeds maximum depth of {max_depth}")]
    DocumentTooDeep { max_depth: usize },

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
