//! Reference scan over the site configuration documents.

use crate::error::{GcError, GcResult};
use folio_content::SettingsStore;
use folio_core::{FileIdSet, extract_file_ids, walk};
use std::ops::ControlFlow;
use std::sync::Arc;
use tracing::{debug, warn};

/// Finds candidate ids embedded anywhere in a configuration document.
#[derive(Clone)]
pub struct ConfigScanner {
    settings: Arc<dyn SettingsStore>,
    max_depth: usize,
}

impl ConfigScanner {
    pub fn new(settings: Arc<dyn SettingsStore>, max_depth: usize) -> Self {
        Self {
            settings,
            max_depth,
        }
    }

    /// Candidates referenced from configuration.
    ///
    /// A document nested deeper than the bound fails the scan: its deep
    /// values could hold references that would otherwise be missed.
    pub async fn scan_config(&self, candidates: &FileIdSet) -> GcResult<FileIdSet> {
        let mut found = FileIdSet::new();
        if candidates.is_empty() {
            return Ok(found);
        }

        let documents = match self.settings.documents().await {
            Ok(documents) => documents,
            Err(e) if e.is_soft() => {
                debug!(error = %e, "Configuration documents unavailable, treating as unreferenced");
                return Ok(found);
            }
            Err(e) => return Err(GcError::Settings(e)),
        };

        for document in &documents {
            if found.len() >= candidates.len() {
                break;
            }
            let outcome = walk(
                &document.value,
                self.max_depth,
                &mut |s: &str| {
                    found.extend(
                        extract_file_ids(s)
                            .into_iter()
                            .filter(|id| candidates.contains(id)),
                    );
                    if found.len() >= candidates.len() {
                        ControlFlow::Break(())
                    } else {
                        ControlFlow::Continue(())
                    }
                },
            )
            .map_err(|source| {
                warn!(key = %document.key, error = %source, "Configuration document rejected");
                GcError::Document {
                    key: document.key.clone(),
                    source,
                }
            })?;
            debug!(
                key = %document.key,
                strings = outcome.strings_visited,
                stopped = outcome.stopped,
                "Scanned configuration document"
            );
        }
        Ok(found)
    }
}
