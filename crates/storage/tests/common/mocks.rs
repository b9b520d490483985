use async_trait::async_trait;
use folio_core::FileId;
use folio_storage::error::StorageResult;
use folio_storage::traits::{AssetStore, ListingOptions, ListingPage};
use folio_storage::MemoryAssetStore;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

/// Wraps a [`MemoryAssetStore`] and records every listing call.
#[allow(dead_code)]
pub struct InstrumentedAssetStore {
    pub inner: MemoryAssetStore,
    pub page_calls: AtomicUsize,
    pub offsets: Mutex<Vec<usize>>,
}

#[allow(dead_code)]
impl InstrumentedAssetStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryAssetStore::new(),
            page_calls: AtomicUsize::new(0),
            offsets: Mutex::new(Vec::new()),
        }
    }

    /// Store `count` files uploaded by `owner`.
    pub fn upload(&self, owner: Uuid, count: usize) -> Vec<FileId> {
        (0..count)
            .map(|_| {
                let id = FileId::new_v4();
                self.inner.insert(id, Some(owner));
                id
            })
            .collect()
    }

    pub fn offsets(&self) -> Vec<usize> {
        self.offsets.lock().unwrap().clone()
    }
}

#[async_trait]
impl AssetStore for InstrumentedAssetStore {
    async fn delete_file(&self, id: &FileId) -> StorageResult<bool> {
        self.inner.delete_file(id).await
    }

    async fn list_uploaded_page(
        &self,
        owner: &Uuid,
        options: &ListingOptions,
        offset: usize,
    ) -> StorageResult<ListingPage> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        self.offsets.lock().unwrap().push(offset);
        self.inner.list_uploaded_page(owner, options, offset).await
    }

    fn backend_name(&self) -> &'static str {
        "instrumented"
    }
}

/// A backend whose listing never ends, or never advances.
#[allow(dead_code)]
pub struct EndlessListingStore {
    /// Report the same offset again instead of advancing.
    pub stuck: bool,
    pub page_calls: AtomicUsize,
}

#[allow(dead_code)]
impl EndlessListingStore {
    pub fn new(stuck: bool) -> Self {
        Self {
            stuck,
            page_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl AssetStore for EndlessListingStore {
    async fn delete_file(&self, _id: &FileId) -> StorageResult<bool> {
        Ok(false)
    }

    async fn list_uploaded_page(
        &self,
        _owner: &Uuid,
        options: &ListingOptions,
        offset: usize,
    ) -> StorageResult<ListingPage> {
        self.page_calls.fetch_add(1, Ordering::SeqCst);
        let next = if self.stuck {
            offset
        } else {
            offset + options.normalized_page_size()
        };
        Ok(ListingPage {
            ids: vec![FileId::new_v4()],
            next_offset: Some(next),
        })
    }

    fn backend_name(&self) -> &'static str {
        "endless"
    }
}
