//! Entity mutation handlers: avatar swaps and deletions of authored items.

use crate::auth::require_actor;
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{GcSummary, owner_of, read_json, sweep};
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Request, State};
use folio_content::Item;
use folio_content::collections::{ACCOUNT, ALBUM, ANIME_ENTRY, ARTICLE, DIARY, PROFILE};
use folio_core::{FileId, FileIdSet, normalize};
use folio_gc::CandidateCollector;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Avatar update request. `avatar` may be a file id, an asset URL, an object
/// with an `id`, or null to clear it.
#[derive(Debug, Deserialize)]
pub struct AvatarRequest {
    pub avatar: Value,
}

/// Avatar update response.
#[derive(Debug, Serialize)]
pub struct AvatarResponse {
    pub id: String,
    pub avatar: Option<FileId>,
    pub gc: GcSummary,
}

/// Deletion response.
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub id: String,
    pub deleted: bool,
    pub gc: GcSummary,
}

/// Normalize a client-supplied avatar. Null and blank strings clear it.
fn parse_avatar(value: &Value) -> ApiResult<Option<FileId>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        other => normalize(other).map(Some).ok_or_else(|| {
            ApiError::BadRequest("avatar must be a file id, asset URL or null".to_string())
        }),
    }
}

fn avatar_patch(field: &str, avatar: Option<FileId>) -> Item {
    let mut patch = Item::new();
    patch.insert(
        field.to_string(),
        avatar.map_or(Value::Null, |id| Value::String(id.to_string())),
    );
    patch
}

/// PATCH /v1/profiles/{profile_id}/avatar
pub async fn update_profile_avatar(
    State(state): State<AppState>,
    Path(profile_id): Path<String>,
    req: Request,
) -> ApiResult<Json<AvatarResponse>> {
    let actor = require_actor(&req)?;
    let owner = owner_of(&state, PROFILE, &profile_id, "account").await?;
    actor.require_owner_or_admin(owner)?;

    let body: AvatarRequest = read_json(req).await?;
    let avatar = parse_avatar(&body.avatar)?;

    let candidates = state.gc.collector().profile_avatar(&profile_id).await;
    state
        .content
        .update_one(PROFILE, &profile_id, avatar_patch("avatar_file", avatar))
        .await?;
    let report = sweep(&state, &candidates).await;

    tracing::info!(
        profile_id = %profile_id,
        avatar = ?avatar,
        deleted = report.deleted.len(),
        "Profile avatar updated"
    );

    Ok(Json(AvatarResponse {
        id: profile_id,
        avatar,
        gc: GcSummary::from(&report),
    }))
}

/// PATCH /v1/accounts/{account_id}/avatar
pub async fn update_account_avatar(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    req: Request,
) -> ApiResult<Json<AvatarResponse>> {
    let actor = require_actor(&req)?;
    actor.require_owner_or_admin(Uuid::parse_str(&account_id).ok())?;

    let body: AvatarRequest = read_json(req).await?;
    let avatar = parse_avatar(&body.avatar)?;

    let candidates = state.gc.collector().account_avatar(&account_id).await;
    state
        .content
        .update_one(ACCOUNT, &account_id, avatar_patch("avatar", avatar))
        .await?;
    let report = sweep(&state, &candidates).await;

    tracing::info!(
        account_id = %account_id,
        avatar = ?avatar,
        deleted = report.deleted.len(),
        "Account avatar updated"
    );

    Ok(Json(AvatarResponse {
        id: account_id,
        avatar,
        gc: GcSummary::from(&report),
    }))
}

/// Authored collections that can be deleted by their author.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Authored {
    Article,
    AnimeEntry,
    Album,
    Diary,
}

impl Authored {
    pub fn collection(self) -> &'static str {
        match self {
            Self::Article => ARTICLE,
            Self::AnimeEntry => ANIME_ENTRY,
            Self::Album => ALBUM,
            Self::Diary => DIARY,
        }
    }

    async fn candidates(self, collector: &CandidateCollector, id: &str) -> FileIdSet {
        match self {
            Self::Article => collector.article(id).await,
            Self::AnimeEntry => collector.anime_entry(id).await,
            Self::Album => collector.album(id).await,
            Self::Diary => collector.diary(id).await,
        }
    }
}

async fn delete_authored(
    state: AppState,
    kind: Authored,
    id: String,
    req: Request,
) -> ApiResult<Json<DeleteResponse>> {
    let actor = require_actor(&req)?;
    let collection = kind.collection();
    let owner = owner_of(&state, collection, &id, "author").await?;
    actor.require_owner_or_admin(owner)?;

    let candidates = kind.candidates(state.gc.collector(), &id).await;
    state.content.delete_one(collection, &id).await?;
    let report = sweep(&state, &candidates).await;

    tracing::info!(
        collection = %collection,
        id = %id,
        candidates = report.candidates,
        deleted = report.deleted.len(),
        "Item deleted"
    );

    Ok(Json(DeleteResponse {
        id,
        deleted: true,
        gc: GcSummary::from(&report),
    }))
}

/// DELETE /v1/articles/{article_id}
pub async fn delete_article(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Request,
) -> ApiResult<Json<DeleteResponse>> {
    delete_authored(state, Authored::Article, id, req).await
}

/// DELETE /v1/anime/{entry_id}
pub async fn delete_anime_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Request,
) -> ApiResult<Json<DeleteResponse>> {
    delete_authored(state, Authored::AnimeEntry, id, req).await
}

/// DELETE /v1/albums/{album_id}
pub async fn delete_album(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Request,
) -> ApiResult<Json<DeleteResponse>> {
    delete_authored(state, Authored::Album, id, req).await
}

/// DELETE /v1/diaries/{diary_id}
pub async fn delete_diary(
    State(state): State<AppState>,
    Path(id): Path<String>,
    req: Request,
) -> ApiResult<Json<DeleteResponse>> {
    delete_authored(state, Authored::Diary, id, req).await
}
