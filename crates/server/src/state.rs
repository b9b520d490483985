//! Application state shared across handlers.

use folio_content::cache::{self, CachePort};
use folio_content::{ContentSettingsStore, ContentStore, SettingsStore};
use folio_core::config::AppConfig;
use folio_gc::AssetGc;
use folio_storage::AssetStore;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Entity data access.
    pub content: Arc<dyn ContentStore>,
    /// Object store holding the files.
    pub assets: Arc<dyn AssetStore>,
    /// Site configuration documents.
    pub settings: Arc<dyn SettingsStore>,
    /// Response cache for read endpoints.
    pub cache: Arc<dyn CachePort>,
    /// Asset garbage collector.
    pub gc: Arc<AssetGc>,
}

impl AppState {
    /// Create a new application state. The configuration is expected to
    /// have been validated; potentially surprising settings are logged.
    pub fn new(
        config: AppConfig,
        content: Arc<dyn ContentStore>,
        assets: Arc<dyn AssetStore>,
    ) -> Self {
        if !config.gc.enabled {
            tracing::warn!("Asset GC disabled, orphaned files will accumulate");
        } else if config.gc.dry_run {
            tracing::warn!("Asset GC in dry-run mode, orphans are reported but kept");
        }

        let settings: Arc<dyn SettingsStore> =
            Arc::new(ContentSettingsStore::new(content.clone()));
        let cache = cache::from_config(&config.cache);
        let gc = Arc::new(AssetGc::new(
            content.clone(),
            assets.clone(),
            settings.clone(),
            &config.gc,
        ));

        Self {
            config: Arc::new(config),
            content,
            assets,
            settings,
            cache,
            gc,
        }
    }
}
