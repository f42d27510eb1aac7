//! Voucher lifecycle routes.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use uuid::Uuid;

use socai_core::posting::{LineTags, VoucherHeaderInput, VoucherLineInput, VoucherType};
use socai_db::repositories::{VoucherFilter, VoucherRepository, VoucherWithLines};
use socai_shared::types::{PageRequest, PageResponse};

use crate::error::ApiError;
use crate::facade::VoucherLifecycle;
use crate::AppState;

/// Creates the voucher routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/vouchers", get(list_vouchers).post(save_voucher))
        .route("/vouchers/{id}", get(get_voucher).delete(delete_voucher))
        .route("/vouchers/{id}/duplicate", post(duplicate_voucher))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for a single voucher line.
#[derive(Debug, Deserialize)]
pub struct LineRequest {
    /// Debit account code.
    pub debit_account: Option<String>,
    /// Credit account code.
    pub credit_account: Option<String>,
    /// Line amount as a decimal string.
    pub amount: String,
    /// Optional line description.
    pub description: Option<String>,
    /// Dimensional tags.
    #[serde(default)]
    pub tags: LineTags,
}

/// Request body for saving a voucher. A present `id` means full replace.
#[derive(Debug, Deserialize)]
pub struct SaveVoucherRequest {
    /// Existing voucher id for updates.
    pub id: Option<Uuid>,
    /// Document number.
    pub doc_no: String,
    /// Document date (YYYY-MM-DD).
    pub doc_date: NaiveDate,
    /// Posting date (YYYY-MM-DD).
    pub posting_date: NaiveDate,
    /// Description.
    pub description: String,
    /// Voucher type.
    #[serde(rename = "type")]
    pub voucher_type: String,
    /// Document number of the original voucher.
    pub original_doc_no: Option<String>,
    /// Budget estimate the voucher spends against.
    pub budget_estimate_id: Option<Uuid>,
    /// Fund source code.
    pub fund_source_code: Option<String>,
    /// Acting user.
    pub actor: String,
    /// Voucher lines.
    pub lines: Vec<LineRequest>,
}

/// Query parameters for listing vouchers.
#[derive(Debug, Deserialize)]
pub struct ListVouchersQuery {
    /// Filter by voucher type.
    #[serde(rename = "type")]
    pub voucher_type: Option<String>,
    /// Filter by status.
    pub status: Option<String>,
    /// Posting date range start (YYYY-MM-DD).
    pub from: Option<NaiveDate>,
    /// Posting date range end (YYYY-MM-DD).
    pub to: Option<NaiveDate>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size.
    pub per_page: Option<u32>,
}

/// Query parameters carrying the acting user.
#[derive(Debug, Deserialize)]
pub struct ActorQuery {
    /// Acting user.
    pub actor: String,
}

/// Request body for duplicating a voucher.
#[derive(Debug, Deserialize)]
pub struct DuplicateRequest {
    /// Acting user.
    pub actor: String,
}

/// Response for a voucher list item.
#[derive(Debug, Serialize)]
pub struct VoucherListItem {
    /// Voucher id.
    pub id: Uuid,
    /// Document number.
    pub doc_no: String,
    /// Posting date.
    pub posting_date: String,
    /// Voucher type.
    #[serde(rename = "type")]
    pub voucher_type: String,
    /// Status.
    pub status: String,
    /// Description.
    pub description: String,
    /// Total amount.
    pub total_amount: String,
}

/// Response for a full voucher.
#[derive(Debug, Serialize)]
pub struct VoucherResponse {
    /// Voucher id.
    pub id: Uuid,
    /// Document number.
    pub doc_no: String,
    /// Document date.
    pub doc_date: String,
    /// Posting date.
    pub posting_date: String,
    /// Description.
    pub description: String,
    /// Voucher type.
    #[serde(rename = "type")]
    pub voucher_type: String,
    /// Status.
    pub status: String,
    /// Document number of the original voucher.
    pub original_doc_no: Option<String>,
    /// Budget estimate id.
    pub budget_estimate_id: Option<Uuid>,
    /// Fund source code.
    pub fund_source_code: Option<String>,
    /// Total amount.
    pub total_amount: String,
    /// Creator.
    pub created_by: String,
    /// Lines.
    pub lines: Vec<serde_json::Value>,
}

impl From<&VoucherWithLines> for VoucherResponse {
    fn from(v: &VoucherWithLines) -> Self {
        Self {
            id: v.voucher.id,
            doc_no: v.voucher.doc_no.clone(),
            doc_date: v.voucher.doc_date.to_string(),
            posting_date: v.voucher.posting_date.to_string(),
            description: v.voucher.description.clone(),
            voucher_type: v.voucher.voucher_type.clone(),
            status: v.voucher.status.clone(),
            original_doc_no: v.voucher.original_doc_no.clone(),
            budget_estimate_id: v.voucher.budget_estimate_id,
            fund_source_code: v.voucher.fund_source_code.clone(),
            total_amount: v.voucher.total_amount.to_string(),
            created_by: v.voucher.created_by.clone(),
            lines: v
                .lines
                .iter()
                .map(|l| {
                    json!({
                        "line_index": l.line_index,
                        "debit_account": l.debit_account,
                        "credit_account": l.credit_account,
                        "amount": l.amount.to_string(),
                        "description": l.description,
                        "tags": l.tags,
                    })
                })
                .collect(),
        }
    }
}

fn parse_header(payload: &SaveVoucherRequest) -> Result<VoucherHeaderInput, ApiError> {
    let voucher_type = VoucherType::parse(&payload.voucher_type)
        .ok_or_else(|| ApiError::Validation(format!("unknown voucher type '{}'", payload.voucher_type)))?;
    Ok(VoucherHeaderInput {
        id: payload.id,
        doc_no: payload.doc_no.clone(),
        doc_date: payload.doc_date,
        posting_date: payload.posting_date,
        description: payload.description.clone(),
        voucher_type,
        original_doc_no: payload.original_doc_no.clone(),
        budget_estimate_id: payload.budget_estimate_id,
        fund_source_code: payload.fund_source_code.clone(),
        created_by: payload.actor.clone(),
    })
}

fn parse_lines(payload: &SaveVoucherRequest) -> Result<Vec<VoucherLineInput>, ApiError> {
    payload
        .lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let amount = Decimal::from_str(&line.amount).map_err(|_| {
                ApiError::Validation(format!("line {i}: amount '{}' is not a decimal", line.amount))
            })?;
            Ok(VoucherLineInput {
                debit_account: line.debit_account.clone(),
                credit_account: line.credit_account.clone(),
                amount,
                description: line.description.clone(),
                tags: line.tags.clone(),
            })
        })
        .collect()
}

// ============================================================================
// Route Handlers
// ============================================================================

/// POST `/vouchers` - Save (create or fully replace) a voucher.
async fn save_voucher(
    State(state): State<AppState>,
    Json(payload): Json<SaveVoucherRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let header = parse_header(&payload)?;
    let lines = parse_lines(&payload)?;

    let facade = VoucherLifecycle::new((*state.db).clone());
    let outcome = facade.save(&header, &lines).await?;

    Ok((
        StatusCode::OK,
        Json(json!({
            "id": outcome.voucher_id,
            "doc_no": outcome.doc_no,
            "budget_check": outcome.budget_check,
        })),
    ))
}

/// GET `/vouchers` - List vouchers with filters.
async fn list_vouchers(
    State(state): State<AppState>,
    Query(query): Query<ListVouchersQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = VoucherRepository::new((*state.db).clone());
    let filter = VoucherFilter {
        voucher_type: query.voucher_type,
        status: query.status,
        date_from: query.from,
        date_to: query.to,
    };
    let page = PageRequest {
        page: query.page.unwrap_or(1),
        per_page: query.per_page.unwrap_or(50),
    };

    let (rows, total) = repo.list(&filter, &page).await?;
    let items: Vec<VoucherListItem> = rows
        .into_iter()
        .map(|v| VoucherListItem {
            id: v.id,
            doc_no: v.doc_no,
            posting_date: v.posting_date.to_string(),
            voucher_type: v.voucher_type,
            status: v.status,
            description: v.description,
            total_amount: v.total_amount.to_string(),
        })
        .collect();

    Ok(Json(PageResponse::new(items, page.page, page.per_page, total)))
}

/// GET `/vouchers/{id}` - Load one voucher with lines.
async fn get_voucher(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let repo = VoucherRepository::new((*state.db).clone());
    let voucher = repo.find_by_id(id).await?;
    Ok(Json(VoucherResponse::from(&voucher)))
}

/// DELETE `/vouchers/{id}` - Delete a voucher with its ledger rows.
async fn delete_voucher(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ActorQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let facade = VoucherLifecycle::new((*state.db).clone());
    facade.delete(id, &query.actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST `/vouchers/{id}/duplicate` - Copy a voucher into a new draft.
async fn duplicate_voucher(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DuplicateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let facade = VoucherLifecycle::new((*state.db).clone());
    let draft = facade.duplicate(id, &payload.actor).await?;
    Ok((StatusCode::CREATED, Json(VoucherResponse::from(&draft))))
}
