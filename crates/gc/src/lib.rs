//! Asset garbage collection for Folio.
//!
//! Files are referenced by id from many collections and from free-form site
//! configuration, with no referential integrity in the store. After a
//! mutation that can drop a reference:
//!
//! 1. a [`CandidateCollector`] captures the entity's file ids beforehand,
//! 2. the mutation runs,
//! 3. the [`OrphanSweeper`] deletes the candidates that neither the
//!    [`ConfigScanner`] nor the [`StructuredScanner`] can find a reference to.
//!
//! Account deletion drives the same steps through [`AccountDeletion`].

pub mod audit;
pub mod candidates;
pub mod cascade;
pub mod config_scan;
pub mod error;
pub mod scanner;
pub mod sweeper;

pub use audit::{RegistryAudit, TargetAudit, TargetStatus, log_audit};
pub use candidates::CandidateCollector;
pub use cascade::{
    AccountDeletion, BLOCKING_REFERENCES, CascadeError, CascadeOutcome, CascadeStage,
};
pub use config_scan::ConfigScanner;
pub use error::{GcError, GcResult};
pub use scanner::StructuredScanner;
pub use sweeper::{OrphanSweeper, SweepReport};

use folio_content::{ContentStore, SettingsStore};
use folio_core::config::GcConfig;
use folio_core::{FileIdSet, ReferenceRegistry};
use folio_storage::AssetStore;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Garbage collector wired to one deployment's stores.
#[derive(Clone)]
pub struct AssetGc {
    content: Arc<dyn ContentStore>,
    enabled: bool,
    collector: CandidateCollector,
    sweeper: OrphanSweeper,
    registry: ReferenceRegistry,
}

impl AssetGc {
    pub fn new(
        content: Arc<dyn ContentStore>,
        assets: Arc<dyn AssetStore>,
        settings: Arc<dyn SettingsStore>,
        config: &GcConfig,
    ) -> Self {
        let registry = ReferenceRegistry::with_extra(&config.extra_reference_targets);
        let collector = CandidateCollector::new(
            content.clone(),
            assets.clone(),
            config.page_size,
            config.max_config_depth,
        );
        let sweeper = OrphanSweeper::new(
            ConfigScanner::new(settings, config.max_config_depth),
            StructuredScanner::new(
                content.clone(),
                registry.clone(),
                config.page_size,
                config.scan_concurrency,
            ),
            assets,
            config.dry_run,
        );
        Self {
            content,
            enabled: config.enabled,
            collector,
            sweeper,
            registry,
        }
    }

    pub fn collector(&self) -> &CandidateCollector {
        &self.collector
    }

    pub fn registry(&self) -> &ReferenceRegistry {
        &self.registry
    }

    pub fn content(&self) -> &Arc<dyn ContentStore> {
        &self.content
    }

    /// Sweep `candidates`. When collection is disabled the candidates are
    /// logged and left alone.
    pub async fn sweep(&self, candidates: &FileIdSet) -> SweepReport {
        if !self.enabled {
            if !candidates.is_empty() {
                info!(
                    candidates = candidates.len(),
                    "Asset GC disabled, leaving candidates in place"
                );
            }
            return SweepReport {
                candidates: candidates.len(),
                ..Default::default()
            };
        }
        self.sweeper.sweep(candidates).await
    }

    /// Delete an account and every file only it referenced.
    pub async fn delete_account(
        &self,
        actor: Option<Uuid>,
        account_id: Uuid,
    ) -> Result<CascadeOutcome, CascadeError> {
        AccountDeletion::new(self, account_id).run(actor).await
    }

    /// Probe every registered target.
    pub async fn audit(&self) -> Vec<TargetAudit> {
        self.registry.audit(self.content.as_ref()).await
    }
}
