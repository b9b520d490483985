//! Garbage collection error types.

use folio_content::ContentError;
use thiserror::Error;

/// Errors that make a reference scan unusable.
///
/// A sweep that sees one of these deletes nothing.
#[derive(Debug, Error)]
pub enum GcError {
    #[error("reference scan of {target} failed: {source}")]
    Scan {
        target: String,
        #[source]
        source: ContentError,
    },

    #[error("reading configuration documents failed: {0}")]
    Settings(#[source] ContentError),

    #[error("configuration document {key} rejected: {source}")]
    Document {
        key: String,
        #[source]
        source: folio_core::Error,
    },
}

/// Result type for garbage collection operations.
pub type GcResult<T> = std::result::Result<T, GcError>;
