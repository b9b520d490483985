//! Configuration types shared across crates.

use crate::document::DEFAULT_MAX_DEPTH;
use crate::reference::ReferenceTarget;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    /// SECURITY: When enabled, ensure this endpoint is network-restricted
    /// to authorized Prometheus scraper IPs only at the infrastructure level.
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

/// Content store (entity data-access layer) configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentConfig {
    /// Remote content store reached over its REST API.
    Http {
        /// Base URL, e.g. "https://cms.internal:8055/".
        base_url: String,
        /// Static bearer token for the service account.
        /// WARNING: Prefer FOLIO_CONTENT__TOKEN env var over storing in config.
        token: Option<String>,
        /// Per-request timeout in seconds.
        #[serde(default = "default_http_timeout_secs")]
        timeout_secs: u64,
    },
    /// In-process store seeded with the platform schema (development and tests).
    #[default]
    Memory,
}

impl ContentConfig {
    /// Validate content store configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Http {
                base_url,
                timeout_secs,
                ..
            } => validate_http("content", base_url, *timeout_secs),
            Self::Memory => Ok(()),
        }
    }
}

/// Object store (asset files) configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AssetStoreConfig {
    /// Remote file service reached over HTTP.
    Http {
        /// Base URL, e.g. "https://cms.internal:8055/".
        base_url: String,
        /// Static bearer token for the service account.
        /// WARNING: Prefer FOLIO_ASSETS__TOKEN env var over storing in config.
        token: Option<String>,
        /// Per-request timeout in seconds.
        #[serde(default = "default_http_timeout_secs")]
        timeout_secs: u64,
    },
    /// In-process store (development and tests).
    #[default]
    Memory,
}

impl AssetStoreConfig {
    /// Validate object store configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Http {
                base_url,
                timeout_secs,
                ..
            } => validate_http("assets", base_url, *timeout_secs),
            Self::Memory => Ok(()),
        }
    }
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn validate_http(section: &str, base_url: &str, timeout_secs: u64) -> Result<(), String> {
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(format!(
            "{section}.base_url must be an http(s) URL, got {base_url:?}"
        ));
    }
    if timeout_secs == 0 {
        return Err(format!("{section}.timeout_secs cannot be 0"));
    }
    Ok(())
}

/// Asset garbage collection configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GcConfig {
    /// Run a sweep after mutations that can drop a reference (default: true).
    /// When false, candidates are still collected and logged but nothing is deleted.
    #[serde(default = "default_gc_enabled")]
    pub enabled: bool,
    /// Dry-run mode: report orphans without deleting them (default: false).
    #[serde(default)]
    pub dry_run: bool,
    /// Rows fetched per page when scanning a reference target.
    #[serde(default = "default_gc_page_size")]
    pub page_size: usize,
    /// Reference targets scanned concurrently (default: 1, sequential).
    #[serde(default = "default_gc_scan_concurrency")]
    pub scan_concurrency: usize,
    /// Maximum nesting depth inspected in configuration documents.
    #[serde(default = "default_gc_max_config_depth")]
    pub max_config_depth: usize,
    /// Probe every reference target at startup and log missing ones.
    #[serde(default = "default_gc_audit_on_startup")]
    pub audit_on_startup: bool,
    /// Deployment-specific asset-bearing fields, appended to the built-in registry.
    #[serde(default)]
    pub extra_reference_targets: Vec<ReferenceTarget>,
}

/// Default rows per page for reference scans.
pub const DEFAULT_GC_PAGE_SIZE: usize = 200;

/// Upper bound for `gc.page_size`.
pub const MAX_GC_PAGE_SIZE: usize = 1000;

fn default_gc_enabled() -> bool {
    true
}

fn default_gc_page_size() -> usize {
    DEFAULT_GC_PAGE_SIZE
}

fn default_gc_scan_concurrency() -> usize {
    1
}

fn default_gc_max_config_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_gc_audit_on_startup() -> bool {
    true
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            enabled: default_gc_enabled(),
            dry_run: false,
            page_size: default_gc_page_size(),
            scan_concurrency: default_gc_scan_concurrency(),
            max_config_depth: default_gc_max_config_depth(),
            audit_on_startup: default_gc_audit_on_startup(),
            extra_reference_targets: Vec::new(),
        }
    }
}

impl GcConfig {
    /// Validate GC configuration for dangerous settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.page_size == 0 || self.page_size > MAX_GC_PAGE_SIZE {
            return Err(format!(
                "gc.page_size must be between 1 and {MAX_GC_PAGE_SIZE}, got {}",
                self.page_size
            ));
        }
        if self.scan_concurrency == 0 {
            return Err("gc.scan_concurrency cannot be 0".to_string());
        }
        if self.max_config_depth == 0 {
            return Err("gc.max_config_depth cannot be 0".to_string());
        }
        for target in &self.extra_reference_targets {
            target.validate().map_err(|e| e.to_string())?;
        }
        Ok(())
    }
}

/// Response cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Enable the in-process response cache.
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Maximum cached entries before new entries are rejected.
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
    /// Time-to-live in seconds for cached entries.
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_max_entries() -> usize {
    10_000
}

fn default_cache_ttl_secs() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            max_entries: default_cache_max_entries(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl CacheConfig {
    /// Get the entry TTL as a Duration.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Content store configuration.
    #[serde(default)]
    pub content: ContentConfig,
    /// Object store configuration.
    #[serde(default)]
    pub assets: AssetStoreConfig,
    /// Asset garbage collection configuration.
    #[serde(default)]
    pub gc: GcConfig,
    /// Response cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Create a test configuration backed by in-memory stores.
    ///
    /// **For testing only.**
    pub fn for_testing() -> Self {
        let mut config = Self::default();
        config.gc.audit_on_startup = false;
        config
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.content.validate()?;
        self.assets.validate()?;
        self.gc.validate()?;
        Ok(())
    }
}
