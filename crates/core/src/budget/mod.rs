//! Budget control service.
//!
//! Spending checks against budget estimates, the append-only budget
//! transaction log, the authorization workflow for over-budget spending
//! and budget alert lifecycle rules.

pub mod alert;
pub mod authorization;
pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use alert::BudgetAlert;
pub use authorization::BudgetAuthorization;
pub use error::BudgetError;
pub use service::{BudgetService, DEFAULT_BLOCK_THRESHOLD, DEFAULT_WARNING_THRESHOLD};
pub use types::{
    AlertSeverity, AlertStatus, AuthorizationStatus, BudgetBalances, BudgetEstimate, BudgetPeriod,
    BudgetTransaction, BudgetTransactionKind, CheckStatus, SpendingDecision,
};
