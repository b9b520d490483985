//! Orphan sweep: candidates minus references, then delete.

use crate::config_scan::ConfigScanner;
use crate::error::GcResult;
use crate::scanner::StructuredScanner;
use folio_core::FileIdSet;
use folio_storage::AssetStore;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Outcome of one sweep.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Number of candidates examined.
    pub candidates: usize,
    /// Candidates found referenced somewhere.
    pub referenced: FileIdSet,
    /// Candidates found unreferenced.
    pub orphans: FileIdSet,
    /// Orphans this sweep removed from the object store. Files that were
    /// already gone are not listed.
    pub deleted: FileIdSet,
    /// Orphans whose deletion failed.
    pub failed: FileIdSet,
    /// A reference scan failed and nothing was deleted.
    pub aborted: bool,
    /// Orphans were reported but not deleted.
    pub dry_run: bool,
}

impl SweepReport {
    fn aborted(candidates: usize, dry_run: bool) -> Self {
        Self {
            candidates,
            aborted: true,
            dry_run,
            ..Default::default()
        }
    }
}

/// Deletes candidates that no scanner can find a reference to.
#[derive(Clone)]
pub struct OrphanSweeper {
    config: ConfigScanner,
    structured: StructuredScanner,
    assets: Arc<dyn AssetStore>,
    dry_run: bool,
}

impl OrphanSweeper {
    pub fn new(
        config: ConfigScanner,
        structured: StructuredScanner,
        assets: Arc<dyn AssetStore>,
        dry_run: bool,
    ) -> Self {
        Self {
            config,
            structured,
            assets,
            dry_run,
        }
    }

    /// Candidates referenced by configuration or by any registered field.
    ///
    /// Configuration is scanned first; the structured scan only looks at
    /// what configuration left unresolved.
    pub async fn referenced(&self, candidates: &FileIdSet) -> GcResult<FileIdSet> {
        let mut referenced = self.config.scan_config(candidates).await?;
        if referenced.len() < candidates.len() {
            let unresolved: FileIdSet = candidates.difference(&referenced).copied().collect();
            referenced.extend(self.structured.scan_all(&unresolved).await?);
        } else {
            debug!(
                candidates = candidates.len(),
                "Every candidate referenced from configuration, skipping structured scan"
            );
        }
        Ok(referenced)
    }

    /// Delete every candidate with no live reference.
    ///
    /// Never fails: a scan error aborts the sweep with nothing deleted, and
    /// a failed deletion is recorded in [`SweepReport::failed`].
    pub async fn sweep(&self, candidates: &FileIdSet) -> SweepReport {
        if candidates.is_empty() {
            return SweepReport {
                dry_run: self.dry_run,
                ..Default::default()
            };
        }

        let referenced = match self.referenced(candidates).await {
            Ok(referenced) => referenced,
            Err(e) => {
                error!(
                    candidates = candidates.len(),
                    error = %e,
                    "Reference scan failed, aborting sweep without deleting"
                );
                return SweepReport::aborted(candidates.len(), self.dry_run);
            }
        };

        let orphans: FileIdSet = candidates.difference(&referenced).copied().collect();
        let mut report = SweepReport {
            candidates: candidates.len(),
            referenced,
            orphans,
            dry_run: self.dry_run,
            ..Default::default()
        };

        for file_id in &report.orphans {
            if self.dry_run {
                info!(file_id = %file_id, "DRY-RUN: Would delete orphaned file");
                continue;
            }

            match self.assets.delete_file(file_id).await {
                Ok(true) => {
                    info!(file_id = %file_id, "Deleted orphaned file");
                    report.deleted.insert(*file_id);
                }
                Ok(false) => {
                    debug!(file_id = %file_id, "Orphaned file already absent");
                }
                Err(e) => {
                    warn!(file_id = %file_id, error = %e, "Failed to delete orphaned file");
                    report.failed.insert(*file_id);
                }
            }
        }

        debug!(
            candidates = report.candidates,
            referenced = report.referenced.len(),
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "Sweep complete"
        );
        report
    }
}
