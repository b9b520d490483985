//! Health and administrative GC endpoints.

use crate::auth::require_admin;
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{read_json, sweep};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Request, State};
use folio_core::{FileIdSet, normalize};
use folio_gc::{SweepReport, TargetAudit, TargetStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub content: &'static str,
    pub assets: &'static str,
}

/// GET /v1/health - intentionally unauthenticated for load balancers.
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    state
        .content
        .health_check()
        .await
        .map_err(|e| ApiError::Unavailable(format!("content store: {e}")))?;
    state
        .assets
        .health_check()
        .await
        .map_err(|e| ApiError::Unavailable(format!("asset store: {e}")))?;

    Ok(Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        content: state.content.backend_name(),
        assets: state.assets.backend_name(),
    }))
}

/// Manual sweep request.
#[derive(Debug, Deserialize)]
pub struct SweepRequest {
    /// File ids in any accepted shape (bare id, asset URL, `{id}` object).
    pub file_ids: Vec<Value>,
}

/// POST /v1/admin/gc/sweep - sweep an explicit candidate set.
pub async fn trigger_sweep(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<SweepReport>> {
    let actor = require_admin(&req)?;
    let body: SweepRequest = read_json(req).await?;

    let mut candidates = FileIdSet::new();
    let mut rejected = Vec::new();
    for value in &body.file_ids {
        match normalize(value) {
            Some(id) => {
                candidates.insert(id);
            }
            None => rejected.push(value.to_string()),
        }
    }
    if !rejected.is_empty() {
        return Err(ApiError::BadRequest(format!(
            "not file ids: {}",
            rejected.join(", ")
        )));
    }

    tracing::info!(
        actor = %actor.id,
        candidates = candidates.len(),
        "Manual GC sweep requested"
    );
    Ok(Json(sweep(&state, &candidates).await))
}

/// Registry audit response.
#[derive(Debug, Serialize)]
pub struct RegistryAuditResponse {
    /// Targets not currently `present`.
    pub missing: usize,
    pub targets: Vec<TargetAudit>,
}

/// GET /v1/admin/gc/registry - probe every reference target.
pub async fn audit_registry(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<RegistryAuditResponse>> {
    require_admin(&req)?;
    let targets = state.gc.audit().await;
    let missing = targets
        .iter()
        .filter(|t| t.status != TargetStatus::Present)
        .count();
    Ok(Json(RegistryAuditResponse { missing, targets }))
}
