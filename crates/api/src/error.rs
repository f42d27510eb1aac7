//! Error mapping from domain errors to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use socai_core::audit::AuditError;
use socai_core::budget::BudgetError;
use socai_core::period::PeriodError;
use socai_core::posting::PostingError;

/// Error type returned by route handlers and the façade.
///
/// Each variant carries the domain error, which knows its own error code
/// and HTTP status.
#[derive(Debug)]
pub enum ApiError {
    /// Posting engine error.
    Posting(PostingError),
    /// Budget control error.
    Budget(BudgetError),
    /// Period lock error.
    Period(PeriodError),
    /// Audit trail error.
    Audit(AuditError),
    /// Malformed request (bad enum value, missing field).
    Validation(String),
}

impl ApiError {
    fn parts(&self) -> (u16, &'static str, String) {
        match self {
            Self::Posting(e) => (e.http_status_code(), e.error_code(), e.to_string()),
            Self::Budget(e) => (e.http_status_code(), e.error_code(), e.to_string()),
            Self::Period(e) => (e.http_status_code(), e.error_code(), e.to_string()),
            Self::Audit(e) => (e.http_status_code(), e.error_code(), e.to_string()),
            Self::Validation(msg) => (400, "VALIDATION_ERROR", msg.clone()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error_code = code, %message, "request failed");
        }
        (status, Json(json!({ "error": code, "message": message }))).into_response()
    }
}

impl From<PostingError> for ApiError {
    fn from(e: PostingError) -> Self {
        Self::Posting(e)
    }
}

impl From<BudgetError> for ApiError {
    fn from(e: BudgetError) -> Self {
        Self::Budget(e)
    }
}

impl From<PeriodError> for ApiError {
    fn from(e: PeriodError) -> Self {
        Self::Period(e)
    }
}

impl From<AuditError> for ApiError {
    fn from(e: AuditError) -> Self {
        Self::Audit(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_status_mapping() {
        let err: ApiError = BudgetError::BudgetExceeded {
            requested: dec!(300000),
            available: dec!(250000),
        }
        .into();
        let (status, code, message) = err.parts();
        assert_eq!(status, 422);
        assert_eq!(code, "BUDGET_EXCEEDED");
        assert!(message.contains("300000"));

        let err: ApiError = PostingError::EmptyVoucher.into();
        assert_eq!(err.parts().0, 400);

        let err = ApiError::Validation("unknown voucher type 'petty'".to_string());
        assert_eq!(err.parts().1, "VALIDATION_ERROR");
    }
}
