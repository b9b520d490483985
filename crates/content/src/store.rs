//! Content store trait definition.

use crate::error::ContentResult;
use crate::query::{Filter, Item, Query};
use async_trait::async_trait;

/// Entity data access for the platform's collections.
///
/// Rows are JSON objects keyed by a string `id`. Implementations must report
/// schema problems through the distinguishable [`crate::ContentError`]
/// variants so callers can tell "this field does not exist here" apart from
/// a transport failure.
#[async_trait]
pub trait ContentStore: Send + Sync + 'static {
    /// Read rows matching `query`.
    async fn read_many(&self, collection: &str, query: &Query) -> ContentResult<Vec<Item>>;

    /// Read one row by id. Returns `None` when no such row exists.
    async fn read_one(
        &self,
        collection: &str,
        id: &str,
        fields: &[&str],
    ) -> ContentResult<Option<Item>> {
        let query = Query::new()
            .filter(Filter::eq("id", id))
            .fields(fields.iter().copied())
            .limit(1);
        Ok(self.read_many(collection, &query).await?.into_iter().next())
    }

    /// Create a row and return it. A missing `id` is generated.
    async fn create_one(&self, collection: &str, item: Item) -> ContentResult<Item>;

    /// Apply `patch` to one row and return the updated row.
    async fn update_one(&self, collection: &str, id: &str, patch: Item) -> ContentResult<Item>;

    /// Apply `patch` to every row matching `filter`. Returns the number of rows updated.
    async fn update_many(&self, collection: &str, filter: &Filter, patch: Item)
    -> ContentResult<u64>;

    /// Delete one row, applying the schema's foreign-key actions.
    async fn delete_one(&self, collection: &str, id: &str) -> ContentResult<()>;

    /// Count rows, optionally filtered.
    async fn count(&self, collection: &str, filter: Option<&Filter>) -> ContentResult<u64>;

    /// Get the name of this backend. Used for logging.
    fn backend_name(&self) -> &'static str;

    /// Verify the store is reachable.
    async fn health_check(&self) -> ContentResult<()> {
        Ok(())
    }
}
