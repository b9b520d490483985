//! Structured reference scan over the registry targets.

use crate::error::{GcError, GcResult};
use folio_content::{ContentError, ContentResult, ContentStore, Filter, Query};
use folio_core::{FileId, FileIdSet, ReferenceRegistry, ReferenceTarget, normalize};
use futures::{StreamExt, stream};
use std::sync::Arc;
use tracing::{debug, warn};

/// Upper bound on candidate ids in one filter, which the HTTP store sends in
/// the query string.
pub const MAX_FILTER_IDS: usize = 40;

/// Tests which candidate ids are still stored in a registered field.
#[derive(Clone)]
pub struct StructuredScanner {
    content: Arc<dyn ContentStore>,
    registry: ReferenceRegistry,
    page_size: usize,
    concurrency: usize,
}

impl StructuredScanner {
    pub fn new(
        content: Arc<dyn ContentStore>,
        registry: ReferenceRegistry,
        page_size: usize,
        concurrency: usize,
    ) -> Self {
        Self {
            content,
            registry,
            page_size: page_size.max(1),
            concurrency: concurrency.max(1),
        }
    }

    pub fn registry(&self) -> &ReferenceRegistry {
        &self.registry
    }

    /// Candidate ids sent in one filter.
    fn batch_size(&self) -> usize {
        self.page_size.min(MAX_FILTER_IDS)
    }

    /// Candidates referenced from `target`.
    ///
    /// Candidates are queried in batches. A row matches when its field holds
    /// a candidate id in any form the normalizer accepts (bare id, any case,
    /// asset URL). A collection or field that is absent or unreadable holds
    /// no references. Any other store failure is returned.
    pub async fn scan(
        &self,
        target: &ReferenceTarget,
        candidates: &FileIdSet,
    ) -> GcResult<FileIdSet> {
        let mut found = FileIdSet::new();
        let ids: Vec<FileId> = candidates.iter().copied().collect();
        let mut substring = true;

        for chunk in ids.chunks(self.batch_size()) {
            if found.len() >= candidates.len() {
                break;
            }
            let batch: FileIdSet = chunk.iter().copied().collect();

            let hits = match self.scan_batch(target, &batch, substring).await {
                Err(ContentError::InvalidQuery(message)) if substring => {
                    debug!(target = %target, error = %message, "Target rejects substring filters, matching exact ids");
                    substring = false;
                    self.scan_batch(target, &batch, false).await
                }
                other => other,
            };

            match hits {
                Ok(hits) => found.extend(hits),
                Err(e) if e.is_soft() => {
                    debug!(target = %target, error = %e, "Reference target unavailable, treating as unreferenced");
                    return Ok(found);
                }
                Err(e) => {
                    return Err(GcError::Scan {
                        target: target.to_string(),
                        source: e,
                    });
                }
            }
        }
        Ok(found)
    }

    /// Page through the rows of `target` that may reference `batch`.
    async fn scan_batch(
        &self,
        target: &ReferenceTarget,
        batch: &FileIdSet,
        substring: bool,
    ) -> ContentResult<FileIdSet> {
        let field = &*target.field;
        let exact = Filter::is_in(field, batch.iter().map(|id| id.to_string()));
        let filter = if substring {
            let mut any = vec![exact];
            any.extend(batch.iter().map(|id| Filter::contains(field, id.to_string())));
            Filter::or(any)
        } else {
            exact
        };

        let mut found = FileIdSet::new();
        let mut offset = 0;
        loop {
            let query = Query::new()
                .filter(filter.clone())
                .fields([field])
                .limit(self.page_size)
                .offset(offset);
            let rows = self.content.read_many(&target.collection, &query).await?;

            let fetched = rows.len();
            found.extend(
                rows.iter()
                    .filter_map(|row| row.get(field).and_then(normalize))
                    .filter(|id| batch.contains(id)),
            );

            if found.len() >= batch.len() || fetched < self.page_size {
                return Ok(found);
            }
            offset += fetched;
        }
    }

    /// Candidates referenced from any registered target.
    ///
    /// Stops as soon as every candidate is accounted for.
    pub async fn scan_all(&self, candidates: &FileIdSet) -> GcResult<FileIdSet> {
        let mut referenced = FileIdSet::new();
        if candidates.is_empty() {
            return Ok(referenced);
        }

        if self.concurrency == 1 {
            for target in self.registry.targets() {
                if referenced.len() >= candidates.len() {
                    break;
                }
                let unresolved: FileIdSet = candidates.difference(&referenced).copied().collect();
                referenced.extend(self.scan(target, &unresolved).await?);
            }
            return Ok(referenced);
        }

        let scans: Vec<_> = self
            .registry
            .targets()
            .iter()
            .map(|target| self.scan(target, candidates))
            .collect();
        let mut scans = stream::iter(scans).buffer_unordered(self.concurrency);
        while referenced.len() < candidates.len() {
            match scans.next().await {
                Some(result) => referenced.extend(result?),
                None => break,
            }
        }
        if referenced.len() > candidates.len() {
            warn!(
                referenced = referenced.len(),
                candidates = candidates.len(),
                "Scan returned ids outside the candidate set"
            );
        }
        Ok(referenced)
    }
}
