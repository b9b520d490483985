//! Content store error types.

use thiserror::Error;

/// Content store operation errors.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("field not found: {0}")]
    FieldNotFound(String),

    #[error("field not writable: {0}")]
    FieldNotWritable(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response ({status}): {message}")]
    UnexpectedStatus { status: u16, message: String },

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ContentError {
    /// Whether this error means "this part of the schema is unavailable in this
    /// deployment" rather than a transport or data failure.
    ///
    /// Callers that probe optional collections treat soft errors as an empty
    /// result instead of failing.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            Self::CollectionNotFound(_)
                | Self::FieldNotFound(_)
                | Self::FieldNotWritable(_)
                | Self::Forbidden(_)
        )
    }
}

/// Result type for content store operations.
pub type ContentResult<T> = std::result::Result<T, ContentError>;
