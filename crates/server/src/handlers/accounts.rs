//! Account deletion.

use crate::auth::require_actor;
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::GcSummary;
use crate::metrics;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, Request, State};
use folio_gc::CascadeError;
use serde::Serialize;
use uuid::Uuid;

/// Account deletion response.
#[derive(Debug, Serialize)]
pub struct AccountDeletionResponse {
    pub account_id: Uuid,
    /// Rows whose blocking reference to the account was nulled.
    pub nullified: u64,
    pub gc: GcSummary,
}

/// DELETE /v1/accounts/{account_id}
///
/// Admins may delete any other account. Deleting your own account is
/// rejected with 409.
pub async fn delete_account(
    State(state): State<AppState>,
    Path(account_id): Path<String>,
    req: Request,
) -> ApiResult<Json<AccountDeletionResponse>> {
    let actor = require_actor(&req)?;
    let account_id = Uuid::parse_str(&account_id)
        .map_err(|e| ApiError::BadRequest(format!("invalid account id: {e}")))?;
    if actor.id != account_id {
        actor.require_admin()?;
    }

    match state.gc.delete_account(Some(actor.id), account_id).await {
        Ok(outcome) => {
            metrics::record_account_deletion("completed");
            metrics::record_sweep(&outcome.gc, None);
            Ok(Json(AccountDeletionResponse {
                account_id,
                nullified: outcome.nullified,
                gc: GcSummary::from(&outcome.gc),
            }))
        }
        Err(e) => {
            let result = match &e {
                CascadeError::SelfDeletion | CascadeError::NotFound(_) => "rejected",
                CascadeError::Store(_) => "failed",
            };
            metrics::record_account_deletion(result);
            Err(e.into())
        }
    }
}
