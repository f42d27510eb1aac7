//! Posting engine error types.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised while validating or posting a voucher.
#[derive(Debug, Error)]
pub enum PostingError {
    /// A voucher must carry at least one line.
    #[error("Voucher has no lines")]
    EmptyVoucher,

    /// A single line failed validation.
    #[error("Line {line_index}: {reason}")]
    InvalidLine {
        /// Zero-based index of the offending line.
        line_index: usize,
        /// Human-readable reason.
        reason: String,
    },

    /// On-balance debit and credit totals differ by more than the tolerance.
    #[error("Voucher is unbalanced: debit {debit} vs credit {credit}")]
    UnbalancedVoucher {
        /// On-balance-sheet debit total.
        debit: Decimal,
        /// On-balance-sheet credit total.
        credit: Decimal,
    },

    /// Posting date falls inside the locked ledger range.
    #[error("Posting date {posting_date} is on or before the ledger lock date {locked_until}")]
    PeriodLocked {
        /// Posting date of the rejected voucher.
        posting_date: NaiveDate,
        /// Current global lock date.
        locked_until: NaiveDate,
    },

    /// Voucher not found.
    #[error("Voucher {0} not found")]
    NotFound(Uuid),

    /// Document number already used by another voucher.
    #[error("Document number '{0}' already exists")]
    DuplicateDocNo(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PostingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyVoucher => "EMPTY_VOUCHER",
            Self::InvalidLine { .. } => "INVALID_LINE",
            Self::UnbalancedVoucher { .. } => "UNBALANCED_VOUCHER",
            Self::PeriodLocked { .. } => "PERIOD_LOCKED",
            Self::NotFound(_) => "VOUCHER_NOT_FOUND",
            Self::DuplicateDocNo(_) => "DUPLICATE_DOC_NO",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::EmptyVoucher | Self::InvalidLine { .. } | Self::UnbalancedVoucher { .. } => 400,
            Self::PeriodLocked { .. } => 423,
            Self::NotFound(_) => 404,
            Self::DuplicateDocNo(_) => 409,
            Self::Database(_) | Self::Internal(_) => 500,
        }
    }
}

impl From<crate::period::PeriodError> for PostingError {
    fn from(err: crate::period::PeriodError) -> Self {
        match err {
            crate::period::PeriodError::PeriodLocked {
                posting_date,
                locked_until,
            } => Self::PeriodLocked {
                posting_date,
                locked_until,
            },
            other => Self::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes_and_status() {
        assert_eq!(PostingError::EmptyVoucher.http_status_code(), 400);
        assert_eq!(
            PostingError::UnbalancedVoucher {
                debit: dec!(100),
                credit: dec!(90),
            }
            .http_status_code(),
            400
        );
        assert_eq!(
            PostingError::DuplicateDocNo("PC-001".into()).http_status_code(),
            409
        );
        assert_eq!(
            PostingError::NotFound(Uuid::nil()).error_code(),
            "VOUCHER_NOT_FOUND"
        );
    }

    #[test]
    fn test_period_error_conversion() {
        let err: PostingError = crate::period::PeriodError::PeriodLocked {
            posting_date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            locked_until: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
        }
        .into();
        assert!(matches!(err, PostingError::PeriodLocked { .. }));
        assert_eq!(err.http_status_code(), 423);
    }
}
