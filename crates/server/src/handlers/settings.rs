//! Site configuration documents.

use crate::auth::require_admin;
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{GcSummary, read_json, sweep};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Request, State};
use folio_content::{SettingsDocument, merge_patch};
use folio_core::check_depth;
use serde::Serialize;
use serde_json::Value;

/// Cache domain for settings documents.
pub const SETTINGS_CACHE_DOMAIN: &str = "settings";

/// Settings update response.
#[derive(Debug, Serialize)]
pub struct SettingsUpdateResponse {
    pub key: String,
    pub value: Value,
    pub gc: GcSummary,
}

/// GET /v1/settings/{key} - served through the response cache.
pub async fn get_settings(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<Json<SettingsDocument>> {
    if let Some(value) = state.cache.get(SETTINGS_CACHE_DOMAIN, &key) {
        tracing::debug!(key = %key, "Settings served from cache");
        return Ok(Json(SettingsDocument { key, value }));
    }

    let document = state
        .settings
        .document(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("settings {key}")))?;
    state
        .cache
        .set(SETTINGS_CACHE_DOMAIN, &key, document.value.clone());
    Ok(Json(document))
}

/// PATCH /v1/settings/{key} - apply a JSON merge patch (RFC 7386).
///
/// File ids present before the patch and absent after it are swept. A patch
/// that would nest the document deeper than the scanners accept is rejected.
pub async fn patch_settings(
    State(state): State<AppState>,
    Path(key): Path<String>,
    req: Request,
) -> ApiResult<Json<SettingsUpdateResponse>> {
    let actor = require_admin(&req)?;
    let patch: Value = read_json(req).await?;

    let before = state
        .settings
        .document(&key)
        .await?
        .map_or(Value::Null, |doc| doc.value);

    let mut merged = before.clone();
    merge_patch(&mut merged, &patch);
    check_depth(&merged, state.config.gc.max_config_depth)
        .map_err(|e| ApiError::BadRequest(format!("settings {key}: {e}")))?;

    let after = state.settings.patch(&key, &patch, Some(actor.id)).await?;
    state.cache.invalidate(SETTINGS_CACHE_DOMAIN, &key);

    let candidates = state.gc.collector().settings_patch(&before, &after.value);
    let report = sweep(&state, &candidates).await;

    tracing::info!(
        key = %key,
        candidates = report.candidates,
        deleted = report.deleted.len(),
        "Settings updated"
    );

    Ok(Json(SettingsUpdateResponse {
        key: after.key,
        value: after.value,
        gc: GcSummary::from(&report),
    }))
}
