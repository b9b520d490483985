//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use folio_core::{FileId, FileIdSet};
use uuid::Uuid;

/// Page size constraints for listing operations.
pub const DEFAULT_PAGE_SIZE: usize = 200;
pub const MIN_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 1000;

/// Upper bound on pages fetched by one full listing.
pub const MAX_LISTING_PAGES: usize = 10_000;

/// Options for listing operations.
#[derive(Clone, Debug)]
pub struct ListingOptions {
    /// Number of files to fetch per page.
    ///
    /// This value will be clamped to [MIN_PAGE_SIZE, MAX_PAGE_SIZE].
    pub page_size: usize,
}

impl ListingOptions {
    /// Create new listing options with the given page size.
    pub fn new(page_size: usize) -> Self {
        Self { page_size }
    }

    /// Get the normalized page size.
    pub fn normalized_page_size(&self) -> usize {
        self.page_size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
    }
}

impl Default for ListingOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// A single page of listing results.
#[derive(Clone, Debug, Default)]
pub struct ListingPage {
    /// File ids in this page.
    pub ids: Vec<FileId>,

    /// Offset of the next page, if there are more results.
    /// If None, this is the last page.
    pub next_offset: Option<usize>,
}

/// Object store holding the platform's binary files.
#[async_trait]
pub trait AssetStore: Send + Sync + 'static {
    /// Delete a file. Returns whether the file existed.
    ///
    /// Deleting a file that does not exist succeeds with `false`, so a
    /// repeated sweep is harmless.
    async fn delete_file(&self, id: &FileId) -> StorageResult<bool>;

    /// Fetch one page of the files uploaded by `owner`, starting at `offset`.
    async fn list_uploaded_page(
        &self,
        owner: &Uuid,
        options: &ListingOptions,
        offset: usize,
    ) -> StorageResult<ListingPage>;

    /// Every file uploaded by `owner`, fetched page by page.
    async fn list_files_uploaded_by(
        &self,
        owner: &Uuid,
        options: ListingOptions,
    ) -> StorageResult<FileIdSet> {
        let mut ids = FileIdSet::new();
        let mut offset = 0;
        for _ in 0..MAX_LISTING_PAGES {
            let page = self.list_uploaded_page(owner, &options, offset).await?;
            ids.extend(page.ids);
            match page.next_offset {
                Some(next) if next > offset => offset = next,
                _ => return Ok(ids),
            }
        }
        tracing::warn!(
            owner = %owner,
            pages = MAX_LISTING_PAGES,
            "Upload listing hit the page limit, result is incomplete"
        );
        Ok(ids)
    }

    /// Get the name of this storage backend.
    ///
    /// Returns a static string identifier for the backend type (e.g., "http", "memory").
    /// Used for logging.
    fn backend_name(&self) -> &'static str;

    /// Verify storage backend connectivity.
    ///
    /// The default implementation returns Ok(()), suitable for backends that
    /// don't require connectivity verification.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}
