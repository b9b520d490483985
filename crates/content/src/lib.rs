//! Content store access for Folio.
//!
//! This crate provides:
//! - The [`ContentStore`] trait over the platform's entity collections
//! - Filters and queries in the remote API's syntax
//! - Backends: remote HTTP API and a schema-aware in-memory store
//! - The [`SettingsStore`] over site configuration documents
//! - The response [`cache::CachePort`] injected into handlers

pub mod backends;
pub mod cache;
pub mod error;
pub mod query;
pub mod schema;
pub mod settings;
pub mod store;

pub use backends::{http::HttpContentStore, memory::MemoryContentStore};
pub use error::{ContentError, ContentResult};
pub use query::{Filter, Item, Query};
pub use schema::{CollectionSchema, OnDelete, Relation, Schema, collections};
pub use settings::{ContentSettingsStore, SettingsDocument, SettingsStore, merge_patch};
pub use store::ContentStore;

use folio_core::config::ContentConfig;
use std::sync::Arc;
use std::time::Duration;

/// Create a content store from configuration.
pub fn from_config(config: &ContentConfig) -> ContentResult<Arc<dyn ContentStore>> {
    config.validate().map_err(ContentError::Config)?;

    match config {
        ContentConfig::Http {
            base_url,
            token,
            timeout_secs,
        } => {
            let store =
                HttpContentStore::new(base_url, token.clone(), Duration::from_secs(*timeout_secs))?;
            Ok(Arc::new(store))
        }
        ContentConfig::Memory => Ok(Arc::new(MemoryContentStore::platform())),
    }
}
