//! Period lock error types.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by the period lock rules.
#[derive(Debug, Error)]
pub enum PeriodError {
    /// Posting date falls on or before the global ledger lock date.
    #[error("Posting date {posting_date} is on or before the ledger lock date {locked_until}")]
    PeriodLocked {
        /// Posting date of the rejected voucher.
        posting_date: NaiveDate,
        /// Current global lock date.
        locked_until: NaiveDate,
    },

    /// Budget period is locked for the given fiscal year and period.
    #[error("Budget period {period}/{fiscal_year} is locked")]
    BudgetPeriodLocked {
        /// Fiscal year of the locked period.
        fiscal_year: i32,
        /// Period number within the fiscal year (1-12).
        period: u32,
    },

    /// Unlocking a budget period requires a non-empty reason.
    #[error("Unlocking a budget period requires a reason")]
    UnlockReasonRequired,

    /// The actor's role may not unlock budget periods.
    #[error("Role '{0}' may not unlock budget periods")]
    UnlockForbidden(String),

    /// Referenced budget period not found.
    #[error("Budget period {0} not found")]
    NotFound(uuid::Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl PeriodError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::PeriodLocked { .. } => "PERIOD_LOCKED",
            Self::BudgetPeriodLocked { .. } => "BUDGET_PERIOD_LOCKED",
            Self::UnlockReasonRequired => "UNLOCK_REASON_REQUIRED",
            Self::UnlockForbidden(_) => "UNLOCK_FORBIDDEN",
            Self::NotFound(_) => "PERIOD_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::PeriodLocked { .. } | Self::BudgetPeriodLocked { .. } => 423,
            Self::UnlockReasonRequired => 400,
            Self::UnlockForbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Database(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_and_status() {
        let err = PeriodError::PeriodLocked {
            posting_date: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
            locked_until: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        };
        assert_eq!(err.error_code(), "PERIOD_LOCKED");
        assert_eq!(err.http_status_code(), 423);

        assert_eq!(
            PeriodError::UnlockReasonRequired.http_status_code(),
            400
        );
        assert_eq!(
            PeriodError::UnlockForbidden("viewer".into()).http_status_code(),
            403
        );
    }

    #[test]
    fn test_period_locked_message_names_both_dates() {
        let err = PeriodError::PeriodLocked {
            posting_date: NaiveDate::from_ymd_opt(2025, 2, 28).unwrap(),
            locked_until: NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
        };
        let msg = err.to_string();
        assert!(msg.contains("2025-02-28"));
        assert!(msg.contains("2025-03-31"));
    }
}
