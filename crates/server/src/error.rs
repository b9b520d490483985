//! API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use folio_content::ContentError;
use folio_gc::CascadeError;
use folio_storage::StorageError;
use serde::Serialize;

/// API error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),

    #[error("content store error: {0}")]
    Content(#[from] ContentError),

    #[error("asset store error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Cascade(#[from] CascadeError),
}

impl ApiError {
    /// Get the error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::Unavailable(_) => "unavailable",
            Self::Internal(_) => "internal_error",
            Self::Content(ContentError::NotFound(_)) => "not_found",
            Self::Content(ContentError::Constraint(_)) => "conflict",
            Self::Content(_) => "content_error",
            Self::Storage(_) => "storage_error",
            Self::Cascade(CascadeError::SelfDeletion) => "self_deletion",
            Self::Cascade(CascadeError::NotFound(_)) => "not_found",
            Self::Cascade(CascadeError::Store(_)) => "cascade_failed",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Content(e) => content_status(e),
            Self::Storage(e) => match e {
                StorageError::NotFound(_) => StatusCode::NOT_FOUND,
                StorageError::Http(_) | StorageError::UnexpectedStatus { .. } => {
                    StatusCode::BAD_GATEWAY
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Cascade(e) => match e {
                CascadeError::SelfDeletion => StatusCode::CONFLICT,
                CascadeError::NotFound(_) => StatusCode::NOT_FOUND,
                CascadeError::Store(inner) => content_status(inner),
            },
        }
    }
}

fn content_status(error: &ContentError) -> StatusCode {
    match error {
        ContentError::NotFound(_) => StatusCode::NOT_FOUND,
        ContentError::Constraint(_) => StatusCode::CONFLICT,
        ContentError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        // The service account itself was refused or the upstream misbehaved.
        ContentError::Forbidden(_)
        | ContentError::Http(_)
        | ContentError::UnexpectedStatus { .. }
        | ContentError::Decode(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        }
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
