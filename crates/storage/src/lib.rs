//! Object storage abstraction and backends for Folio asset files.
//!
//! This crate provides:
//! - Idempotent file deletion
//! - Paged listing of the files a user uploaded
//! - Backends: remote file API and in-memory

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::{http::HttpAssetStore, memory::MemoryAssetStore};
pub use error::{StorageError, StorageResult};
pub use traits::{AssetStore, ListingOptions, ListingPage};

use folio_core::config::AssetStoreConfig;
use std::sync::Arc;
use std::time::Duration;

/// Create an asset store from configuration.
pub fn from_config(config: &AssetStoreConfig) -> StorageResult<Arc<dyn AssetStore>> {
    config.validate().map_err(StorageError::Config)?;

    match config {
        AssetStoreConfig::Http {
            base_url,
            token,
            timeout_secs,
        } => {
            let backend =
                HttpAssetStore::new(base_url, token.clone(), Duration::from_secs(*timeout_secs))?;
            Ok(Arc::new(backend))
        }
        AssetStoreConfig::Memory => Ok(Arc::new(MemoryAssetStore::new())),
    }
}
