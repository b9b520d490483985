use async_trait::async_trait;
use folio_content::{ContentError, ContentResult, ContentStore, Filter, Item, MemoryContentStore, Query};
use folio_core::FileId;
use folio_storage::{AssetStore, ListingOptions, ListingPage, MemoryAssetStore, StorageError, StorageResult};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Content store wrapper that counts reads per collection and can make
/// chosen collections fail with a transport-style error.
#[allow(dead_code)]
pub struct InstrumentedContentStore {
    inner: Arc<MemoryContentStore>,
    reads: Mutex<HashMap<String, usize>>,
    failing: Mutex<HashSet<String>>,
    widest_filter: Mutex<usize>,
}

#[allow(dead_code)]
impl InstrumentedContentStore {
    pub fn new(inner: Arc<MemoryContentStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            reads: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            widest_filter: Mutex::new(0),
        })
    }

    pub fn fail_collection(&self, collection: &str) {
        self.failing.lock().unwrap().insert(collection.to_string());
    }

    pub fn reads(&self, collection: &str) -> usize {
        self.reads.lock().unwrap().get(collection).copied().unwrap_or(0)
    }

    pub fn total_reads(&self) -> usize {
        self.reads.lock().unwrap().values().sum()
    }

    /// Most `_in` values any read sent in one filter.
    pub fn widest_filter(&self) -> usize {
        *self.widest_filter.lock().unwrap()
    }

    pub fn reset(&self) {
        self.reads.lock().unwrap().clear();
    }

    fn check(&self, collection: &str) -> ContentResult<()> {
        if self.failing.lock().unwrap().contains(collection) {
            return Err(ContentError::UnexpectedStatus {
                status: 503,
                message: format!("{collection} unavailable"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ContentStore for InstrumentedContentStore {
    async fn read_many(&self, collection: &str, query: &Query) -> ContentResult<Vec<Item>> {
        *self
            .reads
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default() += 1;
        if let Some(filter) = &query.filter {
            let mut widest = self.widest_filter.lock().unwrap();
            *widest = (*widest).max(in_values(filter));
        }
        self.check(collection)?;
        self.inner.read_many(collection, query).await
    }

    async fn create_one(&self, collection: &str, item: Item) -> ContentResult<Item> {
        self.inner.create_one(collection, item).await
    }

    async fn update_one(&self, collection: &str, id: &str, patch: Item) -> ContentResult<Item> {
        self.inner.update_one(collection, id, patch).await
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        patch: Item,
    ) -> ContentResult<u64> {
        self.inner.update_many(collection, filter, patch).await
    }

    async fn delete_one(&self, collection: &str, id: &str) -> ContentResult<()> {
        self.check(collection)?;
        self.inner.delete_one(collection, id).await
    }

    async fn count(&self, collection: &str, filter: Option<&Filter>) -> ContentResult<u64> {
        self.inner.count(collection, filter).await
    }

    fn backend_name(&self) -> &'static str {
        "instrumented"
    }
}

fn in_values(filter: &Filter) -> usize {
    match filter {
        Filter::In { values, .. } => values.len(),
        Filter::And(filters) | Filter::Or(filters) => filters.iter().map(in_values).sum(),
        _ => 0,
    }
}

/// Asset store that fails deletes for chosen ids and records every attempt.
#[allow(dead_code)]
pub struct FlakyAssetStore {
    inner: Arc<MemoryAssetStore>,
    fail_ids: HashSet<FileId>,
    attempts: Mutex<Vec<FileId>>,
}

#[allow(dead_code)]
impl FlakyAssetStore {
    pub fn new(inner: Arc<MemoryAssetStore>, fail_ids: impl IntoIterator<Item = FileId>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_ids: fail_ids.into_iter().collect(),
            attempts: Mutex::new(Vec::new()),
        })
    }

    pub fn attempts(&self) -> Vec<FileId> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetStore for FlakyAssetStore {
    async fn delete_file(&self, id: &FileId) -> StorageResult<bool> {
        self.attempts.lock().unwrap().push(*id);
        if self.fail_ids.contains(id) {
            return Err(StorageError::Backend(format!("injected failure for {id}")));
        }
        self.inner.delete_file(id).await
    }

    async fn list_uploaded_page(
        &self,
        owner: &Uuid,
        options: &ListingOptions,
        offset: usize,
    ) -> StorageResult<ListingPage> {
        self.inner.list_uploaded_page(owner, options, offset).await
    }

    fn backend_name(&self) -> &'static str {
        "flaky"
    }
}
