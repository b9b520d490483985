//! Response cache port.
//!
//! Handlers cache read responses per (domain, key) and invalidate them after
//! mutations. Asset garbage collection never goes through the cache.

use dashmap::{DashMap, mapref::entry::Entry};
use folio_core::config::CacheConfig;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Injected response cache.
pub trait CachePort: Send + Sync + 'static {
    fn get(&self, domain: &str, key: &str) -> Option<Value>;

    fn set(&self, domain: &str, key: &str, value: Value);

    fn invalidate(&self, domain: &str, key: &str);

    /// Drop every entry of `domain`.
    fn invalidate_domain(&self, domain: &str);
}

/// Build the cache described by `config`.
pub fn from_config(config: &CacheConfig) -> Arc<dyn CachePort> {
    if config.enabled {
        Arc::new(MemoryCache::new(config.max_entries, config.ttl()))
    } else {
        Arc::new(NoopCache)
    }
}

struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

/// In-process cache with per-entry TTL and an entry cap.
pub struct MemoryCache {
    entries: DashMap<(String, String), CacheEntry>,
    max_entries: usize,
    ttl: Duration,
    /// Whether the at-capacity warning has been logged.
    at_capacity_warned: AtomicBool,
}

impl MemoryCache {
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
            ttl,
            at_capacity_warned: AtomicBool::new(false),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
    }
}

impl CachePort for MemoryCache {
    fn get(&self, domain: &str, key: &str) -> Option<Value> {
        let cache_key = (domain.to_string(), key.to_string());
        let entry = self.entries.get(&cache_key)?;
        if entry.expires_at > Instant::now() {
            return Some(entry.value.clone());
        }
        drop(entry);
        self.entries.remove(&cache_key);
        None
    }

    fn set(&self, domain: &str, key: &str, value: Value) {
        let cache_key = (domain.to_string(), key.to_string());
        let expires_at = Instant::now() + self.ttl;

        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&cache_key) {
            self.evict_expired();
            if self.entries.len() >= self.max_entries {
                if !self.at_capacity_warned.swap(true, Ordering::Relaxed) {
                    tracing::warn!(
                        max_entries = self.max_entries,
                        "Response cache at capacity, new entries are not cached"
                    );
                }
                return;
            }
        }
        self.at_capacity_warned.store(false, Ordering::Relaxed);

        match self.entries.entry(cache_key) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(CacheEntry { value, expires_at });
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry { value, expires_at });
            }
        }
    }

    fn invalidate(&self, domain: &str, key: &str) {
        self.entries.remove(&(domain.to_string(), key.to_string()));
    }

    fn invalidate_domain(&self, domain: &str) {
        self.entries.retain(|(d, _), _| d != domain);
    }
}

/// Cache that stores nothing.
pub struct NoopCache;

impl CachePort for NoopCache {
    fn get(&self, _domain: &str, _key: &str) -> Option<Value> {
        None
    }

    fn set(&self, _domain: &str, _key: &str, _value: Value) {}

    fn invalidate(&self, _domain: &str, _key: &str) {}

    fn invalidate_domain(&self, _domain: &str) {}
}
