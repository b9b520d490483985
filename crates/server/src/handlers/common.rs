//! Shared handler helpers.

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;
use axum::extract::Request;
use folio_core::FileIdSet;
use folio_gc::SweepReport;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Instant;
use uuid::Uuid;

/// Maximum accepted JSON request body size (1 MiB).
pub const MAX_JSON_BODY_SIZE: usize = 1024 * 1024;

/// Read and decode a JSON request body.
pub async fn read_json<T: DeserializeOwned>(req: Request) -> ApiResult<T> {
    let bytes = axum::body::to_bytes(req.into_body(), MAX_JSON_BODY_SIZE)
        .await
        .map_err(|e| ApiError::BadRequest(format!("failed to read body: {e}")))?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::BadRequest(format!("invalid JSON: {e}")))
}

/// Sweep summary attached to every mutation response.
#[derive(Debug, Serialize)]
pub struct GcSummary {
    pub candidates: usize,
    /// Unreferenced candidates, deleted or not.
    pub orphans: FileIdSet,
    pub deleted: FileIdSet,
    pub failed: FileIdSet,
    pub aborted: bool,
    pub dry_run: bool,
}

impl From<&SweepReport> for GcSummary {
    fn from(report: &SweepReport) -> Self {
        Self {
            candidates: report.candidates,
            orphans: report.orphans.clone(),
            deleted: report.deleted.clone(),
            failed: report.failed.clone(),
            aborted: report.aborted,
            dry_run: report.dry_run,
        }
    }
}

/// Run a timed sweep and record it.
pub async fn sweep(state: &AppState, candidates: &FileIdSet) -> SweepReport {
    let started = Instant::now();
    let report = state.gc.sweep(candidates).await;
    metrics::record_sweep(&report, Some(started.elapsed()));
    report
}

/// Read the account that owns row `id` of `collection` through `owner_field`.
///
/// Fails with 404 when the row does not exist; a row without a parseable
/// owner yields `None`.
pub async fn owner_of(
    state: &AppState,
    collection: &str,
    id: &str,
    owner_field: &str,
) -> ApiResult<Option<Uuid>> {
    let row = state
        .content
        .read_one(collection, id, &["id", owner_field])
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("{collection} {id}")))?;
    Ok(row
        .get(owner_field)
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok()))
}
