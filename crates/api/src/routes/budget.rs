//! Budget control routes: availability, spending checks, authorizations,
//! period locks and alerts.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use uuid::Uuid;

use tracing::warn;

use socai_core::actor::ActorRole;
use socai_core::audit::{AuditAction, AuditRecordContent, AuditTrailRecord};
use socai_core::budget::{AlertStatus, BudgetAlert, BudgetAuthorization, BudgetService};
use socai_db::repositories::{AuditRepository, BudgetRepository, PeriodRepository};
use socai_shared::types::{PageRequest, PageResponse};

use crate::error::ApiError;
use crate::AppState;

/// Creates the budget routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/budget/estimates/{id}/availability", get(estimate_availability))
        .route("/budget/check", post(check_spending))
        .route("/budget/authorizations", post(request_authorization))
        .route("/budget/authorizations/{id}/approve", post(approve_authorization))
        .route("/budget/authorizations/{id}/reject", post(reject_authorization))
        .route("/budget/periods/{id}/lock", post(lock_period))
        .route("/budget/periods/{id}/unlock", post(unlock_period))
        .route("/budget/alerts", get(list_alerts))
        .route("/budget/alerts/{id}/acknowledge", post(acknowledge_alert))
        .route("/budget/alerts/{id}/resolve", post(resolve_alert))
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for a dry-run spending check.
#[derive(Debug, Deserialize)]
pub struct CheckSpendingRequest {
    /// Estimate to check against.
    pub estimate_id: Uuid,
    /// Spending amount as a decimal string.
    pub amount: String,
    /// Posting date that selects the budget period.
    pub posting_date: NaiveDate,
}

/// Request body for a new authorization request.
#[derive(Debug, Deserialize)]
pub struct AuthorizationRequest {
    /// Estimate the spending draws from.
    pub estimate_id: Uuid,
    /// Requested amount as a decimal string.
    pub amount: String,
    /// Requesting actor.
    pub requested_by: String,
    /// Why the over-budget spending is needed.
    pub justification: String,
}

/// Request body for approving an authorization.
#[derive(Debug, Deserialize)]
pub struct ApproveRequest {
    /// Deciding actor.
    pub actor: String,
    /// Declared role of the actor.
    pub role: String,
    /// Optional adjusted amount as a decimal string.
    pub approved_amount: Option<String>,
}

/// Request body for rejecting an authorization.
#[derive(Debug, Deserialize)]
pub struct RejectRequest {
    /// Deciding actor.
    pub actor: String,
    /// Declared role of the actor.
    pub role: String,
    /// Rejection reason.
    pub reason: String,
}

/// Request body for locking a budget period.
#[derive(Debug, Deserialize)]
pub struct LockPeriodRequest {
    /// Acting user.
    pub actor: String,
    /// Optional lock reason.
    pub reason: Option<String>,
}

/// Request body for unlocking a budget period.
#[derive(Debug, Deserialize)]
pub struct UnlockPeriodRequest {
    /// Acting user.
    pub actor: String,
    /// Declared role of the actor.
    pub role: String,
    /// Mandatory unlock reason.
    pub reason: String,
}

/// Query parameters for listing alerts.
#[derive(Debug, Deserialize)]
pub struct ListAlertsQuery {
    /// Filter by alert status.
    pub status: Option<String>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size.
    pub per_page: Option<u32>,
}

/// Request body for acknowledging an alert.
#[derive(Debug, Deserialize)]
pub struct AcknowledgeRequest {
    /// Acting user.
    pub actor: String,
}

/// Request body for resolving an alert.
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    /// Resolution notes.
    pub notes: String,
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_amount(value: &str) -> Result<Decimal, ApiError> {
    Decimal::from_str(value)
        .map_err(|_| ApiError::Validation(format!("amount '{value}' is not a decimal")))
}

fn parse_role(value: &str) -> Result<ActorRole, ApiError> {
    ActorRole::parse(value).ok_or_else(|| ApiError::Validation(format!("unknown role '{value}'")))
}

fn authorization_json(auth: &BudgetAuthorization) -> serde_json::Value {
    json!({
        "id": auth.id,
        "estimate_id": auth.estimate_id,
        "requested_amount": auth.requested_amount.to_string(),
        "approved_amount": auth.approved_amount.map(|a| a.to_string()),
        "available_snapshot": auth.available_snapshot.to_string(),
        "status": auth.status.as_str(),
        "requested_by": auth.requested_by,
        "decided_by": auth.decided_by,
        "reason": auth.reason,
        "justification": auth.justification,
        "expires_at": auth.expires_at,
        "created_at": auth.created_at,
    })
}

fn alert_json(alert: &BudgetAlert) -> serde_json::Value {
    json!({
        "id": alert.id,
        "estimate_id": alert.estimate_id,
        "severity": alert.severity.as_str(),
        "status": alert.status.as_str(),
        "utilization": alert.utilization.to_string(),
        "message": alert.message,
        "acknowledged_by": alert.acknowledged_by,
        "resolution_notes": alert.resolution_notes,
        "created_at": alert.created_at,
    })
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/budget/estimates/{id}/availability` - Current balances of one
/// estimate, folded from the transaction log.
async fn estimate_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = BudgetRepository::new((*state.db).clone());
    let estimate = repo.find_estimate(id).await?;

    Ok(Json(json!({
        "id": estimate.id,
        "code": estimate.code,
        "name": estimate.name,
        "fiscal_year": estimate.fiscal_year,
        "allocated_amount": estimate.allocated_amount.to_string(),
        "committed_amount": estimate.committed_amount.to_string(),
        "spent_amount": estimate.spent_amount.to_string(),
        "available": estimate.available().to_string(),
    })))
}

/// POST `/budget/check` - Dry-run a spending check without posting.
///
/// Blocked spending returns 200 with `allowed: false`; only a locked
/// period or a malformed request produces an error status.
async fn check_spending(
    State(state): State<AppState>,
    Json(payload): Json<CheckSpendingRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let amount = parse_amount(&payload.amount)?;

    let budget = BudgetRepository::new((*state.db).clone());
    let periods = PeriodRepository::new((*state.db).clone());

    let estimate = budget.find_estimate(payload.estimate_id).await?;
    let period = periods
        .find_period(payload.posting_date.year(), payload.posting_date.month())
        .await?;

    let decision = BudgetService::check_spending(&estimate, period.as_ref(), amount)?;
    Ok(Json(decision))
}

/// POST `/budget/authorizations` - Request an over-budget spending
/// authorization.
async fn request_authorization(
    State(state): State<AppState>,
    Json(payload): Json<AuthorizationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let amount = parse_amount(&payload.amount)?;

    let repo = BudgetRepository::new((*state.db).clone());
    let estimate = repo.find_estimate(payload.estimate_id).await?;

    let auth = BudgetAuthorization::new_request(
        payload.estimate_id,
        amount,
        estimate.available(),
        &payload.requested_by,
        &payload.justification,
        Utc::now(),
        state.config.ledger.authorization_expiry_hours,
    )?;
    repo.insert_authorization(&auth).await?;

    Ok((StatusCode::CREATED, Json(authorization_json(&auth))))
}

/// POST `/budget/authorizations/{id}/approve` - Approve a pending
/// authorization, optionally at a reduced amount.
async fn approve_authorization(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApproveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let role = parse_role(&payload.role)?;
    let approved_amount = payload
        .approved_amount
        .as_deref()
        .map(parse_amount)
        .transpose()?;

    let repo = BudgetRepository::new((*state.db).clone());
    let mut auth = repo.find_authorization(id).await?;
    auth.approve(role, approved_amount, &payload.actor, Utc::now())?;
    repo.save_authorization_decision(&auth).await?;

    Ok(Json(authorization_json(&auth)))
}

/// POST `/budget/authorizations/{id}/reject` - Reject a pending
/// authorization with a reason.
async fn reject_authorization(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let role = parse_role(&payload.role)?;

    let repo = BudgetRepository::new((*state.db).clone());
    let mut auth = repo.find_authorization(id).await?;
    auth.reject(role, &payload.reason, &payload.actor, Utc::now())?;
    repo.save_authorization_decision(&auth).await?;

    Ok(Json(authorization_json(&auth)))
}

/// POST `/budget/periods/{id}/lock` - Lock a budget period against
/// spending.
async fn lock_period(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<LockPeriodRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = PeriodRepository::new((*state.db).clone());
    let period = repo
        .lock_period(id, &payload.actor, payload.reason.as_deref())
        .await?;
    Ok(Json(period))
}

/// POST `/budget/periods/{id}/unlock` - Unlock a budget period. Requires
/// an elevated role and a reason.
async fn unlock_period(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UnlockPeriodRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let role = parse_role(&payload.role)?;

    let repo = PeriodRepository::new((*state.db).clone());
    let period = repo.unlock_period(id, &payload.reason, role).await?;

    // The period row only tracks the current lock holder; who unlocked
    // it and why goes to the audit trail.
    let record = AuditTrailRecord::seal(AuditRecordContent {
        entity_type: "budget_period".to_string(),
        entity_id: id.to_string(),
        action: AuditAction::UnlockPeriod,
        actor: payload.actor.clone(),
        reason: Some(payload.reason.clone()),
        before: Some(json!({ "is_locked": true })),
        after: Some(json!({ "is_locked": false })),
        changed_fields: vec!["is_locked".to_string()],
        occurred_at: Utc::now(),
    });
    let audit = AuditRepository::new((*state.db).clone());
    if let Err(e) = audit.append(&record).await {
        warn!(error = %e, period_id = %id, "failed to append period unlock audit record");
    }

    Ok(Json(period))
}

/// GET `/budget/alerts` - List alerts, newest first.
async fn list_alerts(
    State(state): State<AppState>,
    Query(query): Query<ListAlertsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(|s| {
            AlertStatus::parse(s)
                .ok_or_else(|| ApiError::Validation(format!("unknown alert status '{s}'")))
        })
        .transpose()?;
    let page = PageRequest {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(50),
    };

    let repo = BudgetRepository::new((*state.db).clone());
    let (alerts, total) = repo.list_alerts(status, &page).await?;
    let items: Vec<serde_json::Value> = alerts.iter().map(alert_json).collect();

    Ok(Json(PageResponse::new(items, page.page, page.per_page, total)))
}

/// POST `/budget/alerts/{id}/acknowledge` - Mark an alert as seen.
async fn acknowledge_alert(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AcknowledgeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = BudgetRepository::new((*state.db).clone());
    let mut alert = repo.find_alert(id).await?;
    alert.acknowledge(&payload.actor)?;
    repo.save_alert(&alert).await?;
    Ok(Json(alert_json(&alert)))
}

/// POST `/budget/alerts/{id}/resolve` - Close an alert with resolution
/// notes.
async fn resolve_alert(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResolveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = BudgetRepository::new((*state.db).clone());
    let mut alert = repo.find_alert(id).await?;
    alert.resolve(&payload.notes)?;
    repo.save_alert(&alert).await?;
    Ok(Json(alert_json(&alert)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("300000").unwrap(), dec!(300000));
        assert_eq!(parse_amount("-1.25").unwrap(), dec!(-1.25));
        assert!(parse_amount("three").is_err());
    }

    #[test]
    fn test_parse_role() {
        assert_eq!(parse_role("chief_accountant").unwrap(), ActorRole::ChiefAccountant);
        assert!(matches!(parse_role("auditor"), Err(ApiError::Validation(_))));
    }
}
