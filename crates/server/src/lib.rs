//! HTTP API server for Folio.
//!
//! This crate provides the mutation endpoints that can drop a file
//! reference, each followed by an asset sweep:
//! - Avatar swaps for profiles and accounts
//! - Deletion of articles, anime entries, albums, diaries and accounts
//! - Site configuration merge patches
//! - Admin endpoints (manual sweep, registry audit)

pub mod auth;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use auth::{Actor, TraceId};
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
