//! Budget control error types.

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by budget control operations.
#[derive(Debug, Error)]
pub enum BudgetError {
    /// Spending would exceed the block threshold with no override path.
    #[error("Budget exceeded: requested {requested}, available {available}")]
    BudgetExceeded {
        /// Requested spending amount.
        requested: Decimal,
        /// Amount still available.
        available: Decimal,
    },

    /// The budget period is locked against spending.
    #[error("Budget period {period}/{fiscal_year} is locked")]
    BudgetPeriodLocked {
        /// Fiscal year of the locked period.
        fiscal_year: i32,
        /// Period number within the fiscal year (1-12).
        period: u32,
    },

    /// Blocked spending needs an approved authorization.
    #[error("Spending of {requested} requires an approved budget authorization")]
    AuthorizationRequired {
        /// Requested spending amount.
        requested: Decimal,
    },

    /// The authorization's expiry has passed.
    #[error("Budget authorization {0} has expired")]
    AuthorizationExpired(Uuid),

    /// A decision was attempted on a non-pending authorization.
    #[error("Budget authorization {id} is {status}, expected PENDING")]
    AuthorizationNotPending {
        /// Authorization id.
        id: Uuid,
        /// Current status.
        status: String,
    },

    /// Amount must be positive.
    #[error("Amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    /// A rejection or resolution requires a non-empty reason.
    #[error("A non-empty reason is required")]
    ReasonRequired,

    /// The actor's role may not perform this operation.
    #[error("Role '{0}' may not perform this budget operation")]
    Forbidden(String),

    /// Referenced record not found.
    #[error("Budget record {0} not found")]
    NotFound(Uuid),

    /// Invalid state transition on an alert.
    #[error("Alert {id} is {status}, cannot {action}")]
    InvalidAlertTransition {
        /// Alert id.
        id: Uuid,
        /// Current status.
        status: String,
        /// Attempted action.
        action: String,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl BudgetError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::BudgetExceeded { .. } => "BUDGET_EXCEEDED",
            Self::BudgetPeriodLocked { .. } => "BUDGET_PERIOD_LOCKED",
            Self::AuthorizationRequired { .. } => "AUTHORIZATION_REQUIRED",
            Self::AuthorizationExpired(_) => "AUTHORIZATION_EXPIRED",
            Self::AuthorizationNotPending { .. } => "AUTHORIZATION_NOT_PENDING",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::ReasonRequired => "REASON_REQUIRED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "BUDGET_RECORD_NOT_FOUND",
            Self::InvalidAlertTransition { .. } => "INVALID_ALERT_TRANSITION",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::BudgetExceeded { .. } => 422,
            Self::BudgetPeriodLocked { .. } => 423,
            Self::AuthorizationRequired { .. } | Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::AuthorizationNotPending { .. } | Self::InvalidAlertTransition { .. } => 409,
            Self::AuthorizationExpired(_) | Self::InvalidAmount(_) | Self::ReasonRequired => 400,
            Self::Database(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_error_codes_and_status() {
        let err = BudgetError::BudgetExceeded {
            requested: dec!(300000),
            available: dec!(250000),
        };
        assert_eq!(err.error_code(), "BUDGET_EXCEEDED");
        assert_eq!(err.http_status_code(), 422);
        assert!(err.to_string().contains("300000"));

        assert_eq!(
            BudgetError::BudgetPeriodLocked {
                fiscal_year: 2025,
                period: 6,
            }
            .http_status_code(),
            423
        );
        assert_eq!(
            BudgetError::AuthorizationRequired {
                requested: dec!(1),
            }
            .http_status_code(),
            403
        );
        assert_eq!(BudgetError::ReasonRequired.http_status_code(), 400);
    }
}
