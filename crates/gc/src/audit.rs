//! Registry audit: does every registered target exist in this deployment?
//!
//! A target the store does not know is scanned as "no references", which is
//! correct for an optional collection and dangerous for a renamed one. The
//! audit makes the difference visible at startup and on demand.

use async_trait::async_trait;
use folio_content::{ContentError, ContentStore, Query};
use folio_core::{ReferenceRegistry, ReferenceTarget};
use serde::Serialize;
use tracing::{info, warn};

/// Probe result for one target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetStatus {
    Present,
    MissingCollection,
    MissingField,
    Forbidden,
    Unreachable,
}

/// Audit line for one target.
#[derive(Clone, Debug, Serialize)]
pub struct TargetAudit {
    pub collection: String,
    pub field: String,
    pub status: TargetStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[async_trait]
pub trait RegistryAudit {
    /// Probe every target with a one-row read.
    async fn audit(&self, store: &dyn ContentStore) -> Vec<TargetAudit>;
}

#[async_trait]
impl RegistryAudit for ReferenceRegistry {
    async fn audit(&self, store: &dyn ContentStore) -> Vec<TargetAudit> {
        let mut results = Vec::with_capacity(self.len());
        for target in self.targets() {
            results.push(probe(store, target).await);
        }
        results
    }
}

async fn probe(store: &dyn ContentStore, target: &ReferenceTarget) -> TargetAudit {
    let query = Query::new().fields([&*target.field]).limit(1);
    let (status, detail) = match store.read_many(&target.collection, &query).await {
        Ok(_) => (TargetStatus::Present, None),
        Err(e) => {
            let status = match &e {
                ContentError::CollectionNotFound(_) => TargetStatus::MissingCollection,
                ContentError::FieldNotFound(_) => TargetStatus::MissingField,
                ContentError::Forbidden(_) | ContentError::FieldNotWritable(_) => {
                    TargetStatus::Forbidden
                }
                _ => TargetStatus::Unreachable,
            };
            (status, Some(e.to_string()))
        }
    };
    TargetAudit {
        collection: target.collection.to_string(),
        field: target.field.to_string(),
        status,
        detail,
    }
}

/// Log the audit: one warning per target that is not present.
pub fn log_audit(results: &[TargetAudit]) {
    let mut missing = 0;
    for result in results {
        if result.status != TargetStatus::Present {
            missing += 1;
            warn!(
                collection = %result.collection,
                field = %result.field,
                status = ?result.status,
                detail = result.detail.as_deref().unwrap_or(""),
                "Reference target not scannable; files referenced only here may be deleted"
            );
        }
    }
    info!(
        targets = results.len(),
        missing,
        "Reference registry audit complete"
    );
}
