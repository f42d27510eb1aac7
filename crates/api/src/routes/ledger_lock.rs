//! Global ledger lock routes.

use axum::{
    extract::State,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use socai_core::audit::{AuditAction, AuditRecordContent, AuditTrailRecord};
use socai_db::repositories::{AuditRepository, PeriodRepository};

use crate::error::ApiError;
use crate::AppState;

/// Creates the ledger lock routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/ledger/lock", get(get_lock).put(set_lock))
}

/// Request body for moving the lock date. A null `locked_until` clears
/// the lock.
#[derive(Debug, Deserialize)]
pub struct SetLockRequest {
    /// New lock date; postings dated on or before it are rejected.
    pub locked_until: Option<NaiveDate>,
    /// Acting user.
    pub actor: String,
}

/// GET `/ledger/lock` - Read the current lock date.
async fn get_lock(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let repo = PeriodRepository::new((*state.db).clone());
    let locked_until = repo.locked_until().await?;
    Ok(Json(json!({ "locked_until": locked_until })))
}

/// PUT `/ledger/lock` - Move the lock date.
async fn set_lock(
    State(state): State<AppState>,
    Json(payload): Json<SetLockRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = PeriodRepository::new((*state.db).clone());
    let previous = repo
        .set_locked_until(payload.locked_until, &payload.actor)
        .await?;

    let record = AuditTrailRecord::seal(AuditRecordContent {
        entity_type: "ledger_lock".to_string(),
        entity_id: "global".to_string(),
        action: AuditAction::SetLock,
        actor: payload.actor.clone(),
        reason: None,
        before: Some(json!({ "locked_until": previous })),
        after: Some(json!({ "locked_until": payload.locked_until })),
        changed_fields: vec!["locked_until".to_string()],
        occurred_at: Utc::now(),
    });
    let audit = AuditRepository::new((*state.db).clone());
    if let Err(e) = audit.append(&record).await {
        warn!(error = %e, "failed to append ledger lock audit record");
    }

    Ok(Json(json!({
        "locked_until": payload.locked_until,
        "previous": previous,
    })))
}
