//! Site configuration documents.
//!
//! Each document is a free-form JSON tree stored in the `value` column of
//! the `site_config` collection, addressed by `key`. Updates are JSON merge
//! patches (RFC 7386).

use crate::error::{ContentError, ContentResult};
use crate::query::{Filter, Item, Query};
use crate::schema::collections::SITE_CONFIG;
use crate::store::ContentStore;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

/// Upper bound on configuration documents read in one pass.
pub const MAX_SETTINGS_DOCUMENTS: usize = 50;

/// One persisted configuration document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SettingsDocument {
    pub key: String,
    pub value: Value,
}

/// Access to the persisted configuration documents.
#[async_trait]
pub trait SettingsStore: Send + Sync + 'static {
    /// Every current document.
    async fn documents(&self) -> ContentResult<Vec<SettingsDocument>>;

    /// One document by key.
    async fn document(&self, key: &str) -> ContentResult<Option<SettingsDocument>>;

    /// Merge `patch` into the document at `key`, creating it if absent.
    /// Returns the post-merge document.
    async fn patch(
        &self,
        key: &str,
        patch: &Value,
        actor: Option<Uuid>,
    ) -> ContentResult<SettingsDocument>;
}

/// [`SettingsStore`] over any [`ContentStore`].
pub struct ContentSettingsStore {
    store: Arc<dyn ContentStore>,
}

impl ContentSettingsStore {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    async fn row(&self, key: &str) -> ContentResult<Option<Item>> {
        let query = Query::new()
            .filter(Filter::eq("key", key))
            .fields(["id", "key", "value"])
            .limit(1);
        Ok(self
            .store
            .read_many(SITE_CONFIG, &query)
            .await?
            .into_iter()
            .next())
    }
}

fn to_document(row: Item) -> Option<SettingsDocument> {
    let key = row.get("key")?.as_str()?.to_string();
    let value = row.get("value").cloned().unwrap_or(Value::Null);
    Some(SettingsDocument { key, value })
}

#[async_trait]
impl SettingsStore for ContentSettingsStore {
    async fn documents(&self) -> ContentResult<Vec<SettingsDocument>> {
        let query = Query::new()
            .fields(["key", "value"])
            .limit(MAX_SETTINGS_DOCUMENTS);
        let rows = self.store.read_many(SITE_CONFIG, &query).await?;
        Ok(rows.into_iter().filter_map(to_document).collect())
    }

    async fn document(&self, key: &str) -> ContentResult<Option<SettingsDocument>> {
        Ok(self.row(key).await?.and_then(to_document))
    }

    async fn patch(
        &self,
        key: &str,
        patch: &Value,
        actor: Option<Uuid>,
    ) -> ContentResult<SettingsDocument> {
        let existing = self.row(key).await?;

        let mut value = existing
            .as_ref()
            .and_then(|row| row.get("value").cloned())
            .unwrap_or(Value::Null);
        merge_patch(&mut value, patch);

        let mut data = Map::new();
        data.insert("value".to_string(), value.clone());
        if let Some(actor) = actor {
            data.insert("updated_by".to_string(), Value::String(actor.to_string()));
        }

        match existing {
            Some(row) => {
                let id = row
                    .get("id")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ContentError::Internal(format!("site_config {key} has no id")))?;
                self.store.update_one(SITE_CONFIG, id, data).await?;
            }
            None => {
                data.insert("key".to_string(), Value::String(key.to_string()));
                self.store.create_one(SITE_CONFIG, data).await?;
            }
        }

        Ok(SettingsDocument {
            key: key.to_string(),
            value,
        })
    }
}

/// Apply an RFC 7386 JSON merge patch to `target` in place.
pub fn merge_patch(target: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *target = patch.clone();
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(map) = target {
        for (key, value) in patch {
            if value.is_null() {
                map.remove(key);
            } else {
                merge_patch(map.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
    }
}
