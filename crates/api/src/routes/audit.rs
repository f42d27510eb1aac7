//! Audit trail routes: querying, integrity verification, anomaly scans,
//! export and reconciliations.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use uuid::Uuid;

use socai_core::actor::ActorRole;
use socai_core::audit::{
    detect_budget_overruns, detect_duplicate_allocations, detect_negative_fund_balances,
    filter_new_findings, Adjustment, Anomaly, AuditError, OutstandingItem, ReconciliationRecord,
    VerificationOutcome,
};
use socai_db::repositories::{AuditFilter, AuditRepository, BudgetRepository, VoucherRepository};
use socai_shared::types::{PageRequest, PageResponse};

use crate::error::ApiError;
use crate::AppState;

/// Creates the audit routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/audit", get(query_trail))
        .route("/audit/export", get(export_trail))
        .route("/audit/history/{entity_type}/{entity_id}", get(entity_history))
        .route("/audit/records/{id}/verify", post(verify_record))
        .route("/audit/anomalies", get(list_anomalies))
        .route("/audit/anomalies/run", post(run_anomaly_scan))
        .route("/audit/anomalies/{id}/acknowledge", post(acknowledge_anomaly))
        .route("/audit/anomalies/{id}/resolve", post(resolve_anomaly))
        .route("/audit/reconciliations", post(create_reconciliation))
        .route("/audit/reconciliations/{id}", get(get_reconciliation))
        .route("/audit/reconciliations/{id}/approve", post(approve_reconciliation))
}

// ============================================================================
// Request Types
// ============================================================================

/// Query parameters for the audit trail.
#[derive(Debug, Deserialize)]
pub struct TrailQuery {
    /// Filter by entity type.
    pub entity_type: Option<String>,
    /// Filter by actor.
    pub actor: Option<String>,
    /// Filter by action.
    pub action: Option<String>,
    /// Occurrence range start.
    pub from: Option<DateTime<Utc>>,
    /// Occurrence range end.
    pub to: Option<DateTime<Utc>>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size.
    pub per_page: Option<u32>,
}

/// Query parameters for the export endpoint.
#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// Export format: "json" or "csv".
    pub format: Option<String>,
}

/// Request body for verifying a record.
#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// Acting user; the verification itself is audited.
    pub actor: String,
}

/// Request body for an anomaly scan.
#[derive(Debug, Deserialize)]
pub struct RunScanRequest {
    /// Fiscal year to scan.
    pub fiscal_year: i32,
}

/// Query parameters for listing anomalies.
#[derive(Debug, Deserialize)]
pub struct ListAnomaliesQuery {
    /// Fiscal year to list.
    pub fiscal_year: i32,
}

/// Request body for acknowledging an anomaly.
#[derive(Debug, Deserialize)]
pub struct AcknowledgeRequest {
    /// Acting user.
    pub actor: String,
}

/// Request body for resolving an anomaly.
#[derive(Debug, Deserialize)]
pub struct ResolveRequest {
    /// Resolution notes.
    pub notes: String,
}

/// Request body for preparing a reconciliation.
#[derive(Debug, Deserialize)]
pub struct CreateReconciliationRequest {
    /// Account being reconciled.
    pub account_code: String,
    /// Cut-off date.
    pub as_of_date: NaiveDate,
    /// Book balance as a decimal string.
    pub book_balance: String,
    /// External balance as a decimal string.
    pub external_balance: String,
    /// Items explaining the difference.
    #[serde(default)]
    pub outstanding_items: Vec<OutstandingItem>,
    /// Proposed adjustments.
    #[serde(default)]
    pub adjustments: Vec<Adjustment>,
    /// Preparing actor.
    pub created_by: String,
}

/// Request body for approving a reconciliation.
#[derive(Debug, Deserialize)]
pub struct ApproveReconciliationRequest {
    /// Acting user.
    pub actor: String,
    /// Declared role of the actor.
    pub role: String,
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

fn anomaly_json(anomaly: &Anomaly) -> serde_json::Value {
    json!({
        "id": anomaly.id,
        "fiscal_year": anomaly.fiscal_year,
        "kind": anomaly.kind.as_str(),
        "root_cause_key": anomaly.root_cause_key,
        "description": anomaly.description,
        "status": anomaly.status.as_str(),
        "acknowledged_by": anomaly.acknowledged_by,
        "resolution_notes": anomaly.resolution_notes,
        "created_at": anomaly.created_at,
    })
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/audit` - Query the trail, newest first.
async fn query_trail(
    State(state): State<AppState>,
    Query(query): Query<TrailQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = AuditRepository::new((*state.db).clone());
    let filter = AuditFilter {
        entity_type: query.entity_type,
        actor: query.actor,
        action: query.action,
        from: query.from,
        to: query.to,
    };
    let page = PageRequest {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(50),
    };

    let (records, total) = repo.query(&filter, &page).await?;
    Ok(Json(PageResponse::new(records, page.page, page.per_page, total)))
}

/// GET `/audit/export` - Export the whole trail as JSON or CSV.
async fn export_trail(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<axum::response::Response, ApiError> {
    let repo = AuditRepository::new((*state.db).clone());
    let records = repo.export_all().await?;

    let format = query.format.as_deref().unwrap_or("json");
    match format {
        "json" => Ok(Json(records).into_response()),
        "csv" => {
            let mut writer = csv::Writer::from_writer(vec![]);
            writer
                .write_record([
                    "id",
                    "occurred_at",
                    "entity_type",
                    "entity_id",
                    "action",
                    "actor",
                    "reason",
                    "changed_fields",
                    "fingerprint",
                ])
                .map_err(|e| AuditError::ExportFailed(e.to_string()))?;
            for record in &records {
                writer
                    .write_record([
                        record.id.to_string(),
                        record.content.occurred_at.to_rfc3339(),
                        record.content.entity_type.clone(),
                        record.content.entity_id.clone(),
                        record.content.action.as_str().to_string(),
                        record.content.actor.clone(),
                        record.content.reason.clone().unwrap_or_default(),
                        record.content.changed_fields.join(";"),
                        record.fingerprint.clone(),
                    ])
                    .map_err(|e| AuditError::ExportFailed(e.to_string()))?;
            }
            let bytes = writer
                .into_inner()
                .map_err(|e| AuditError::ExportFailed(e.to_string()))?;
            let body = String::from_utf8(bytes)
                .map_err(|e| AuditError::ExportFailed(e.to_string()))?;

            Ok((
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
                body,
            )
                .into_response())
        }
        other => Err(AuditError::UnsupportedFormat(other.to_string()).into()),
    }
}

/// GET `/audit/history/{entity_type}/{entity_id}` - Full history of one
/// entity, oldest first.
async fn entity_history(
    State(state): State<AppState>,
    Path((entity_type, entity_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = AuditRepository::new((*state.db).clone());
    let records = repo.entity_history(&entity_type, &entity_id).await?;
    Ok(Json(records))
}

/// POST `/audit/records/{id}/verify` - Recompute and compare a record's
/// fingerprint. A mismatch is reported as a conflict.
async fn verify_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VerifyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = AuditRepository::new((*state.db).clone());
    let outcome = repo.verify_integrity(id, &payload.actor).await?;

    match outcome {
        VerificationOutcome::Verified => Ok(Json(json!({ "id": id, "outcome": outcome }))),
        VerificationOutcome::Mismatch => Err(AuditError::IntegrityMismatch(id).into()),
    }
}

/// GET `/audit/anomalies` - List anomalies of a fiscal year, newest
/// first.
async fn list_anomalies(
    State(state): State<AppState>,
    Query(query): Query<ListAnomaliesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = AuditRepository::new((*state.db).clone());
    let anomalies = repo.list_anomalies(query.fiscal_year).await?;
    let items: Vec<serde_json::Value> = anomalies.iter().map(anomaly_json).collect();
    Ok(Json(items))
}

/// POST `/audit/anomalies/run` - Scan a fiscal year for anomalies.
///
/// Findings whose root cause already has an OPEN anomaly are skipped, so
/// re-running the scan over unchanged data creates nothing new.
async fn run_anomaly_scan(
    State(state): State<AppState>,
    Json(payload): Json<RunScanRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let audit = AuditRepository::new((*state.db).clone());
    let budget = BudgetRepository::new((*state.db).clone());
    let vouchers = VoucherRepository::new((*state.db).clone());

    let estimates = budget.list_estimates(payload.fiscal_year).await?;
    let fund_balances = vouchers.fund_balances().await?;
    let transactions = budget
        .transactions_for_fiscal_year(payload.fiscal_year)
        .await?;

    let mut findings = detect_budget_overruns(&estimates);
    findings.extend(detect_negative_fund_balances(&fund_balances));
    findings.extend(detect_duplicate_allocations(&transactions));
    let detected = findings.len();

    let open_keys = audit.open_root_cause_keys(payload.fiscal_year).await?;
    let new_findings = filter_new_findings(findings, &open_keys);

    let now = Utc::now();
    let anomalies: Vec<Anomaly> = new_findings
        .into_iter()
        .map(|f| Anomaly::from_finding(f, payload.fiscal_year, now))
        .collect();
    audit.insert_anomalies(&anomalies).await?;

    let items: Vec<serde_json::Value> = anomalies.iter().map(anomaly_json).collect();
    Ok(Json(json!({
        "fiscal_year": payload.fiscal_year,
        "detected": detected,
        "new": anomalies.len(),
        "anomalies": items,
    })))
}

/// POST `/audit/anomalies/{id}/acknowledge` - Mark an anomaly as seen.
async fn acknowledge_anomaly(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AcknowledgeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = AuditRepository::new((*state.db).clone());
    let mut anomaly = repo.find_anomaly(id).await?;
    anomaly.acknowledge(&payload.actor)?;
    repo.save_anomaly(&anomaly).await?;
    Ok(Json(anomaly_json(&anomaly)))
}

/// POST `/audit/anomalies/{id}/resolve` - Close an anomaly with notes.
async fn resolve_anomaly(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ResolveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = AuditRepository::new((*state.db).clone());
    let mut anomaly = repo.find_anomaly(id).await?;
    anomaly.resolve(&payload.notes)?;
    repo.save_anomaly(&anomaly).await?;
    Ok(Json(anomaly_json(&anomaly)))
}

/// POST `/audit/reconciliations` - Prepare a reconciliation draft.
async fn create_reconciliation(
    State(state): State<AppState>,
    Json(payload): Json<CreateReconciliationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let book_balance = parse_amount(&payload.book_balance)?;
    let external_balance = parse_amount(&payload.external_balance)?;

    let record = ReconciliationRecord::create(
        &payload.account_code,
        payload.as_of_date,
        book_balance,
        external_balance,
        payload.outstanding_items,
        payload.adjustments,
        &payload.created_by,
        Utc::now(),
    );

    let repo = AuditRepository::new((*state.db).clone());
    repo.insert_reconciliation(&record).await?;

    Ok((StatusCode::CREATED, Json(record)))
}

/// GET `/audit/reconciliations/{id}` - Load one reconciliation.
async fn get_reconciliation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = AuditRepository::new((*state.db).clone());
    let record = repo.find_reconciliation(id).await?;
    Ok(Json(record))
}

/// POST `/audit/reconciliations/{id}/approve` - Approve a reconciliation.
/// Requires an elevated role.
async fn approve_reconciliation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<ApproveReconciliationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let role = parse_role(&payload.role)?;

    let repo = AuditRepository::new((*state.db).clone());
    let mut record = repo.find_reconciliation(id).await?;
    record.approve(role, &payload.actor)?;
    repo.save_reconciliation(&record).await?;

    Ok(Json(record))
}
