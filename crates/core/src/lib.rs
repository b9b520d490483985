//! Core domain types shared by every Folio crate.
//!
//! This crate defines:
//! - File identifiers and the normalizer for heterogeneous asset references
//! - The registry of (collection, field) pairs that may hold a file id
//! - Depth-bounded traversal of free-form configuration documents
//! - Configuration types

pub mod config;
pub mod document;
pub mod error;
pub mod file_id;
pub mod reference;

pub use document::{DocumentVisitor, WalkOutcome, check_depth, embedded_file_ids, walk};
pub use error::{Error, Result};
pub use file_id::{FileId, FileIdSet, extract_file_ids, normalize, normalize_str};
pub use reference::{REFERENCE_TARGETS, ReferenceRegistry, ReferenceTarget};
