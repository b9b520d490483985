//! In-memory asset store.

use crate::error::StorageResult;
use crate::traits::{AssetStore, ListingOptions, ListingPage};
use async_trait::async_trait;
use dashmap::DashMap;
use folio_core::{FileId, FileIdSet};
use uuid::Uuid;

/// In-memory [`AssetStore`] recording each file's uploader.
#[derive(Default)]
pub struct MemoryAssetStore {
    files: DashMap<FileId, Option<Uuid>>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a stored file.
    pub fn insert(&self, id: FileId, uploaded_by: Option<Uuid>) {
        self.files.insert(id, uploaded_by);
    }

    pub fn contains(&self, id: &FileId) -> bool {
        self.files.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Every stored file id.
    pub fn file_ids(&self) -> FileIdSet {
        self.files.iter().map(|entry| *entry.key()).collect()
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn delete_file(&self, id: &FileId) -> StorageResult<bool> {
        Ok(self.files.remove(id).is_some())
    }

    async fn list_uploaded_page(
        &self,
        owner: &Uuid,
        options: &ListingOptions,
        offset: usize,
    ) -> StorageResult<ListingPage> {
        let page_size = options.normalized_page_size();
        let owned: FileIdSet = self
            .files
            .iter()
            .filter(|entry| entry.value().as_ref() == Some(owner))
            .map(|entry| *entry.key())
            .collect();

        let ids: Vec<FileId> = owned.into_iter().skip(offset).take(page_size).collect();
        let next_offset = (ids.len() == page_size).then(|| offset + page_size);
        Ok(ListingPage { ids, next_offset })
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
