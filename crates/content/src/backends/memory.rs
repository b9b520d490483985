//! In-memory content store.
//!
//! Enforces a [`Schema`]: unknown collections and fields fail with the same
//! errors the remote store reports, read-only fields reject writes, and
//! deletes apply cascade, restrict and set-null foreign-key actions.

use crate::error::{ContentError, ContentResult};
use crate::query::{Filter, Item, Query, values_equal};
use crate::schema::{CollectionSchema, OnDelete, Schema};
use crate::store::ContentStore;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    rows: BTreeMap<String, Vec<Item>>,
    forbidden: HashSet<String>,
}

/// Schema-aware in-memory [`ContentStore`].
pub struct MemoryContentStore {
    schema: Schema,
    inner: RwLock<Inner>,
}

impl MemoryContentStore {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Store with the platform's default schema.
    pub fn platform() -> Self {
        Self::new(Schema::platform())
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Deny every operation on `collection`.
    pub async fn set_forbidden(&self, collection: &str) {
        self.inner.write().await.forbidden.insert(collection.to_string());
    }

    /// Number of rows currently stored in `collection`.
    pub async fn row_count(&self, collection: &str) -> usize {
        self.inner
            .read()
            .await
            .rows
            .get(collection)
            .map_or(0, Vec::len)
    }

    fn collection(&self, inner: &Inner, name: &str) -> ContentResult<&CollectionSchema> {
        let schema = self
            .schema
            .collection(name)
            .ok_or_else(|| ContentError::CollectionNotFound(name.to_string()))?;
        if inner.forbidden.contains(name) {
            return Err(ContentError::Forbidden(name.to_string()));
        }
        Ok(schema)
    }

    fn check_fields<'a>(
        schema: &CollectionSchema,
        fields: impl IntoIterator<Item = &'a str>,
    ) -> ContentResult<()> {
        for field in fields {
            if field != "*" && !schema.has_field(field) {
                return Err(ContentError::FieldNotFound(format!(
                    "{}.{}",
                    schema.name, field
                )));
            }
        }
        Ok(())
    }

    fn check_patch(schema: &CollectionSchema, patch: &Item) -> ContentResult<()> {
        Self::check_fields(schema, patch.keys().map(String::as_str))?;
        if patch.contains_key("id") {
            return Err(ContentError::FieldNotWritable(format!("{}.id", schema.name)));
        }
        for field in patch.keys() {
            if !schema.is_writable(field) {
                return Err(ContentError::FieldNotWritable(format!(
                    "{}.{}",
                    schema.name, field
                )));
            }
        }
        Ok(())
    }

    /// Rows removed by deleting `(collection, id)`, following cascades.
    fn deletion_plan(&self, inner: &Inner, collection: &str, id: &str) -> BTreeSet<(String, String)> {
        let mut plan = BTreeSet::new();
        let mut queue = VecDeque::from([(collection.to_string(), id.to_string())]);

        while let Some((target, target_id)) = queue.pop_front() {
            if !plan.insert((target.clone(), target_id.clone())) {
                continue;
            }
            let key = Value::String(target_id);
            for (referrer, relation) in self.schema.referencing(&target) {
                if relation.on_delete != OnDelete::Cascade {
                    continue;
                }
                for row in inner.rows.get(&referrer.name).into_iter().flatten() {
                    let references = row
                        .get(&relation.field)
                        .is_some_and(|v| values_equal(v, &key));
                    if references && let Some(referrer_id) = row_id(row) {
                        queue.push_back((referrer.name.clone(), referrer_id.to_string()));
                    }
                }
            }
        }
        plan
    }
}

fn row_id(row: &Item) -> Option<&str> {
    row.get("id").and_then(Value::as_str)
}

fn in_plan(plan: &BTreeSet<(String, String)>, collection: &str, row: &Item) -> bool {
    row_id(row).is_some_and(|id| plan.contains(&(collection.to_string(), id.to_string())))
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn read_many(&self, collection: &str, query: &Query) -> ContentResult<Vec<Item>> {
        let inner = self.inner.read().await;
        let schema = self.collection(&inner, collection)?;
        Self::check_fields(schema, query.fields.iter().map(String::as_str))?;
        if let Some(filter) = &query.filter {
            Self::check_fields(schema, filter.fields())?;
        }

        let rows = inner.rows.get(collection).map(Vec::as_slice).unwrap_or(&[]);
        let matching = rows
            .iter()
            .filter(|row| query.filter.as_ref().is_none_or(|f| f.matches(row)))
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|row| query.project(row))
            .collect();
        Ok(matching)
    }

    async fn create_one(&self, collection: &str, mut item: Item) -> ContentResult<Item> {
        let mut inner = self.inner.write().await;
        let schema = self.collection(&inner, collection)?;
        Self::check_fields(schema, item.keys().map(String::as_str))?;

        let id = match item.get("id") {
            Some(Value::String(id)) => id.clone(),
            Some(other) => {
                return Err(ContentError::InvalidQuery(format!(
                    "{collection}.id must be a string, got {other}"
                )));
            }
            None => Uuid::new_v4().to_string(),
        };
        let rows = inner.rows.entry(collection.to_string()).or_default();
        if rows.iter().any(|row| row_id(row) == Some(id.as_str())) {
            return Err(ContentError::Constraint(format!(
                "duplicate id {id} in {collection}"
            )));
        }
        item.insert("id".to_string(), Value::String(id));
        rows.push(item.clone());
        Ok(item)
    }

    async fn update_one(&self, collection: &str, id: &str, patch: Item) -> ContentResult<Item> {
        let mut inner = self.inner.write().await;
        let schema = self.collection(&inner, collection)?;
        Self::check_patch(schema, &patch)?;

        let row = inner
            .rows
            .get_mut(collection)
            .and_then(|rows| rows.iter_mut().find(|row| row_id(row) == Some(id)))
            .ok_or_else(|| ContentError::NotFound(format!("{collection}/{id}")))?;
        row.extend(patch);
        Ok(row.clone())
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Item,
    ) -> ContentResult<u64> {
        let mut inner = self.inner.write().await;
        let schema = self.collection(&inner, collection)?;
        Self::check_fields(schema, filter.fields())?;
        Self::check_patch(schema, &patch)?;

        let mut updated = 0;
        for row in inner.rows.get_mut(collection).into_iter().flatten() {
            if filter.matches(row) {
                row.extend(patch.clone());
                updated += 1;
            }
        }
        Ok(updated)
    }

    async fn delete_one(&self, collection: &str, id: &str) -> ContentResult<()> {
        let mut inner = self.inner.write().await;
        self.collection(&inner, collection)?;
        let exists = inner
            .rows
            .get(collection)
            .is_some_and(|rows| rows.iter().any(|row| row_id(row) == Some(id)));
        if !exists {
            return Err(ContentError::NotFound(format!("{collection}/{id}")));
        }

        let plan = self.deletion_plan(&inner, collection, id);

        // Restrict is checked after cascades are planned: a referencing row
        // that is itself being deleted does not block.
        for (target, target_id) in &plan {
            let key = Value::String(target_id.clone());
            for (referrer, relation) in self.schema.referencing(target) {
                if relation.on_delete != OnDelete::Restrict {
                    continue;
                }
                let blocked = inner.rows.get(&referrer.name).into_iter().flatten().any(|row| {
                    row.get(&relation.field).is_some_and(|v| values_equal(v, &key))
                        && !in_plan(&plan, &referrer.name, row)
                });
                if blocked {
                    return Err(ContentError::Constraint(format!(
                        "{}.{} still references {target}/{target_id}",
                        referrer.name, relation.field
                    )));
                }
            }
        }

        for (target, target_id) in &plan {
            let key = Value::String(target_id.clone());
            for (referrer, relation) in self.schema.referencing(target) {
                if relation.on_delete != OnDelete::SetNull {
                    continue;
                }
                for row in inner.rows.get_mut(&referrer.name).into_iter().flatten() {
                    if row.get(&relation.field).is_some_and(|v| values_equal(v, &key)) {
                        row.insert(relation.field.clone(), Value::Null);
                    }
                }
            }
        }

        for (name, rows) in inner.rows.iter_mut() {
            rows.retain(|row| !in_plan(&plan, name, row));
        }
        Ok(())
    }

    async fn count(&self, collection: &str, filter: Option<&Filter>) -> ContentResult<u64> {
        let inner = self.inner.read().await;
        let schema = self.collection(&inner, collection)?;
        if let Some(filter) = filter {
            Self::check_fields(schema, filter.fields())?;
        }
        let count = inner
            .rows
            .get(collection)
            .into_iter()
            .flatten()
            .filter(|row| filter.is_none_or(|f| f.matches(row)))
            .count();
        Ok(count as u64)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::collections::*;
    use serde_json::json;

    fn item(value: Value) -> Item {
        value.as_object().cloned().unwrap()
    }

    async fn seed_account(store: &MemoryContentStore, id: &str) {
        store
            .create_one(ACCOUNT, item(json!({ "id": id, "email": format!("{id}@example.com") })))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_collection_and_field() {
        let store = MemoryContentStore::platform();
        let err = store.read_many("event", &Query::new()).await.unwrap_err();
        assert!(matches!(err, ContentError::CollectionNotFound(_)));

        let query = Query::new().filter(Filter::eq("poster", "x"));
        let err = store.read_many(ARTICLE, &query).await.unwrap_err();
        assert!(matches!(err, ContentError::FieldNotFound(_)));
    }

    #[tokio::test]
    async fn test_forbidden_collection() {
        let store = MemoryContentStore::platform();
        store.set_forbidden(ACCOUNT).await;
        let err = store.count(ACCOUNT, None).await.unwrap_err();
        assert!(matches!(err, ContentError::Forbidden(_)));
        assert!(err.is_soft());
    }

    #[tokio::test]
    async fn test_paging_and_count() {
        let store = MemoryContentStore::platform();
        seed_account(&store, "a1").await;
        for i in 0..5 {
            store
                .create_one(ARTICLE, item(json!({ "title": format!("t{i}"), "author": "a1" })))
                .await
                .unwrap();
        }
        let filter = Filter::eq("author", "a1");
        assert_eq!(store.count(ARTICLE, Some(&filter)).await.unwrap(), 5);

        let page = Query::new().filter(filter).fields(["id"]).limit(2).offset(4);
        let rows = store.read_many(ARTICLE, &page).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 1);
    }

    #[tokio::test]
    async fn test_update_one_and_read_only() {
        let schema = Schema::platform().with_collection(
            CollectionSchema::new(NOTIFICATION)
                .relation("recipient", ACCOUNT, OnDelete::Cascade)
                .relation("sender", ACCOUNT, OnDelete::Restrict)
                .read_only("sender"),
        );
        let store = MemoryContentStore::new(schema);
        seed_account(&store, "a1").await;

        let updated = store
            .update_one(ACCOUNT, "a1", item(json!({ "avatar": "f1" })))
            .await
            .unwrap();
        assert_eq!(updated["avatar"], json!("f1"));

        let err = store
            .update_many(NOTIFICATION, &Filter::eq("sender", "a1"), item(json!({ "sender": null })))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::FieldNotWritable(_)));

        let err = store
            .update_one(ACCOUNT, "missing", item(json!({ "avatar": null })))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_cascades_and_sets_null() {
        let store = MemoryContentStore::platform();
        seed_account(&store, "a1").await;
        store
            .create_one(PROFILE, item(json!({ "id": "p1", "account": "a1" })))
            .await
            .unwrap();
        store
            .create_one(ALBUM, item(json!({ "id": "al1", "author": "a1", "updated_by": "a1" })))
            .await
            .unwrap();
        store
            .create_one(ALBUM_PHOTO, item(json!({ "album": "al1", "file_id": "f1" })))
            .await
            .unwrap();
        store
            .create_one(
                REGISTRATION_REQUEST,
                item(json!({ "id": "r1", "approved_account": "a1" })),
            )
            .await
            .unwrap();

        // The album's own updated_by row is deleted with it, so it does not block.
        store.delete_one(ACCOUNT, "a1").await.unwrap();

        assert_eq!(store.row_count(PROFILE).await, 0);
        assert_eq!(store.row_count(ALBUM).await, 0);
        assert_eq!(store.row_count(ALBUM_PHOTO).await, 0);
        let request = store
            .read_one(REGISTRATION_REQUEST, "r1", &[])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request["approved_account"], Value::Null);
    }

    #[tokio::test]
    async fn test_delete_restricted_by_surviving_row() {
        let store = MemoryContentStore::platform();
        seed_account(&store, "a1").await;
        seed_account(&store, "a2").await;
        store
            .create_one(ARTICLE, item(json!({ "author": "a2", "updated_by": "a1" })))
            .await
            .unwrap();

        let err = store.delete_one(ACCOUNT, "a1").await.unwrap_err();
        assert!(matches!(err, ContentError::Constraint(_)));
        assert_eq!(store.row_count(ACCOUNT).await, 2);

        store
            .update_many(ARTICLE, &Filter::eq("updated_by", "a1"), item(json!({ "updated_by": null })))
            .await
            .unwrap();
        store.delete_one(ACCOUNT, "a1").await.unwrap();
        assert_eq!(store.row_count(ARTICLE).await, 1);
    }

    #[tokio::test]
    async fn test_delete_missing_row() {
        let store = MemoryContentStore::platform();
        let err = store.delete_one(ARTICLE, "nope").await.unwrap_err();
        assert!(matches!(err, ContentError::NotFound(_)));
    }
}
