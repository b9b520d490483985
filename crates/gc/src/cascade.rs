//! Account deletion cascade.
//!
//! Stages run strictly in order:
//! `CollectCandidates -> NullifyBlockingReferences -> DeleteEntity -> Sweep -> Done`.
//! Candidates are captured before anything is written. The sweep runs only
//! after the account row is gone and never fails the deletion.

use crate::AssetGc;
use crate::sweeper::SweepReport;
use folio_content::{ContentError, Filter, Item, collections::*};
use folio_core::{FileIdSet, ReferenceTarget};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Restrict-style references to an account that would block its deletion.
/// They are nulled before the delete.
pub const BLOCKING_REFERENCES: &[ReferenceTarget] = &[
    ReferenceTarget::new(NOTIFICATION, "sender"),
    ReferenceTarget::new(ARTICLE, "updated_by"),
    ReferenceTarget::new(ANIME_ENTRY, "updated_by"),
    ReferenceTarget::new(ALBUM, "updated_by"),
    ReferenceTarget::new(DIARY, "updated_by"),
    ReferenceTarget::new(SITE_CONFIG, "updated_by"),
    ReferenceTarget::new(REGISTRATION_REQUEST, "reviewed_by"),
];

/// Cascade stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeStage {
    CollectCandidates,
    NullifyBlockingReferences,
    DeleteEntity,
    Sweep,
    Done,
}

/// Account deletion errors.
#[derive(Debug, Error)]
pub enum CascadeError {
    #[error("an account cannot delete itself")]
    SelfDeletion,

    #[error("account not found: {0}")]
    NotFound(Uuid),

    #[error("account deletion failed: {0}")]
    Store(#[source] ContentError),
}

/// Outcome of a completed cascade.
#[derive(Clone, Debug, Serialize)]
pub struct CascadeOutcome {
    pub account_id: Uuid,
    /// Rows whose blocking reference was nulled.
    pub nullified: u64,
    pub gc: SweepReport,
}

/// One run of the cascade for one account.
pub struct AccountDeletion<'a> {
    gc: &'a AssetGc,
    account_id: Uuid,
    stage: CascadeStage,
    candidates: FileIdSet,
    nullified: u64,
    report: SweepReport,
}

impl<'a> AccountDeletion<'a> {
    pub fn new(gc: &'a AssetGc, account_id: Uuid) -> Self {
        Self {
            gc,
            account_id,
            stage: CascadeStage::CollectCandidates,
            candidates: FileIdSet::new(),
            nullified: 0,
            report: SweepReport::default(),
        }
    }

    pub fn stage(&self) -> CascadeStage {
        self.stage
    }

    /// Run every stage. `actor` is the authenticated caller, if any.
    pub async fn run(mut self, actor: Option<Uuid>) -> Result<CascadeOutcome, CascadeError> {
        if actor == Some(self.account_id) {
            return Err(CascadeError::SelfDeletion);
        }
        self.ensure_exists().await?;

        while self.stage != CascadeStage::Done {
            debug!(account_id = %self.account_id, stage = ?self.stage, "Account deletion stage");
            self.stage = match self.stage {
                CascadeStage::CollectCandidates => {
                    self.candidates = self.gc.collector().account(&self.account_id).await;
                    CascadeStage::NullifyBlockingReferences
                }
                CascadeStage::NullifyBlockingReferences => {
                    self.nullify_blocking_references().await;
                    CascadeStage::DeleteEntity
                }
                CascadeStage::DeleteEntity => {
                    self.delete_account().await?;
                    CascadeStage::Sweep
                }
                CascadeStage::Sweep => {
                    self.report = self.gc.sweep(&self.candidates).await;
                    CascadeStage::Done
                }
                CascadeStage::Done => CascadeStage::Done,
            };
        }

        info!(
            account_id = %self.account_id,
            nullified = self.nullified,
            candidates = self.report.candidates,
            deleted = self.report.deleted.len(),
            "Account deleted"
        );
        Ok(CascadeOutcome {
            account_id: self.account_id,
            nullified: self.nullified,
            gc: self.report,
        })
    }

    async fn ensure_exists(&self) -> Result<(), CascadeError> {
        let id = self.account_id.to_string();
        match self.gc.content().read_one(ACCOUNT, &id, &["id"]).await {
            Ok(Some(_)) => Ok(()),
            Ok(None) | Err(ContentError::NotFound(_)) => {
                Err(CascadeError::NotFound(self.account_id))
            }
            Err(e) => Err(CascadeError::Store(e)),
        }
    }

    async fn nullify_blocking_references(&mut self) {
        let id = self.account_id.to_string();
        for target in BLOCKING_REFERENCES {
            let filter = Filter::eq(&*target.field, id.as_str());
            let mut patch = Item::new();
            patch.insert(target.field.to_string(), Value::Null);

            match self
                .gc
                .content()
                .update_many(&target.collection, &filter, patch)
                .await
            {
                Ok(updated) => {
                    if updated > 0 {
                        debug!(target = %target, updated, "Nulled blocking references");
                    }
                    self.nullified += updated;
                }
                Err(e) if e.is_soft() => {
                    debug!(target = %target, error = %e, "Blocking reference not writable, skipping");
                }
                Err(e) => {
                    warn!(target = %target, error = %e, "Failed to null blocking references");
                }
            }
        }
    }

    async fn delete_account(&self) -> Result<(), CascadeError> {
        let id = self.account_id.to_string();
        match self.gc.content().delete_one(ACCOUNT, &id).await {
            Ok(()) => Ok(()),
            Err(ContentError::NotFound(_)) => Err(CascadeError::NotFound(self.account_id)),
            Err(e) => {
                warn!(account_id = %self.account_id, error = %e, "Account delete failed");
                Err(CascadeError::Store(e))
            }
        }
    }
}
