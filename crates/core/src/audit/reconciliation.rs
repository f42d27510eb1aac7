//! Account reconciliation workflow.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actor::ActorRole;
use crate::audit::error::AuditError;

/// Reconciliation lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationStatus {
    /// Prepared, awaiting approval.
    Draft,
    /// Approved by an elevated role.
    Approved,
}

impl ReconciliationStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Approved => "APPROVED",
        }
    }

    /// Parse a status from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "APPROVED" => Some(Self::Approved),
            _ => None,
        }
    }
}

/// An item explaining part of the book/external difference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutstandingItem {
    /// Reference (document number, bank statement line).
    pub reference: String,
    /// Item amount.
    pub amount: Decimal,
    /// Explanation.
    pub description: String,
}

/// A proposed adjustment entry arising from the reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adjustment {
    /// Account to adjust.
    pub account_code: String,
    /// Adjustment amount (sign carries the direction).
    pub amount: Decimal,
    /// Explanation.
    pub description: String,
}

/// A reconciliation of a book balance against an external statement.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationRecord {
    /// Record id.
    pub id: Uuid,
    /// Account being reconciled.
    pub account_code: String,
    /// Cut-off date of the comparison.
    pub as_of_date: NaiveDate,
    /// Balance per the general ledger.
    pub book_balance: Decimal,
    /// Balance per the external statement.
    pub external_balance: Decimal,
    /// `book_balance - external_balance`.
    pub difference: Decimal,
    /// Items explaining the difference.
    pub outstanding_items: Vec<OutstandingItem>,
    /// Proposed adjustments.
    pub adjustments: Vec<Adjustment>,
    /// Lifecycle status.
    pub status: ReconciliationStatus,
    /// Preparer.
    pub created_by: String,
    /// Approver.
    pub approved_by: Option<String>,
    /// Preparation timestamp.
    pub created_at: DateTime<Utc>,
}

impl ReconciliationRecord {
    /// Creates a DRAFT reconciliation, computing the difference.
    #[must_use]
    pub fn create(
        account_code: &str,
        as_of_date: NaiveDate,
        book_balance: Decimal,
        external_balance: Decimal,
        outstanding_items: Vec<OutstandingItem>,
        adjustments: Vec<Adjustment>,
        created_by: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            account_code: account_code.to_string(),
            as_of_date,
            book_balance,
            external_balance,
            difference: book_balance - external_balance,
            outstanding_items,
            adjustments,
            status: ReconciliationStatus::Draft,
            created_by: created_by.to_string(),
            approved_by: None,
            created_at: now,
        }
    }

    /// Approves the reconciliation.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for a non-elevated role and `InvalidTransition`
    /// when already approved.
    pub fn approve(&mut self, role: ActorRole, approved_by: &str) -> Result<(), AuditError> {
        if !role.can_approve_reconciliation() {
            return Err(AuditError::Forbidden(role.as_str().to_string()));
        }
        if self.status == ReconciliationStatus::Approved {
            return Err(AuditError::InvalidTransition {
                id: self.id,
                status: self.status.as_str().to_string(),
                action: "approve".to_string(),
            });
        }
        self.status = ReconciliationStatus::Approved;
        self.approved_by = Some(approved_by.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn draft() -> ReconciliationRecord {
        ReconciliationRecord::create(
            "112",
            NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            dec!(150000),
            dec!(148500),
            vec![OutstandingItem {
                reference: "UNC-2025-17".to_string(),
                amount: dec!(1500),
                description: "cheque not yet presented".to_string(),
            }],
            vec![],
            "accountant1",
            Utc::now(),
        )
    }

    #[test]
    fn test_create_computes_difference() {
        let rec = draft();
        assert_eq!(rec.difference, dec!(1500));
        assert_eq!(rec.status, ReconciliationStatus::Draft);
        assert!(rec.approved_by.is_none());
    }

    #[test]
    fn test_approve_requires_elevated_role() {
        let mut rec = draft();
        assert!(matches!(
            rec.approve(ActorRole::Accountant, "acct"),
            Err(AuditError::Forbidden(_))
        ));

        rec.approve(ActorRole::ChiefAccountant, "chief1").unwrap();
        assert_eq!(rec.status, ReconciliationStatus::Approved);
        assert_eq!(rec.approved_by.as_deref(), Some("chief1"));
    }

    #[test]
    fn test_double_approval_rejected() {
        let mut rec = draft();
        rec.approve(ActorRole::Admin, "admin1").unwrap();
        assert!(matches!(
            rec.approve(ActorRole::Admin, "admin2"),
            Err(AuditError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_negative_difference() {
        let rec = ReconciliationRecord::create(
            "111",
            NaiveDate::from_ymd_opt(2025, 6, 30).unwrap(),
            dec!(100),
            dec!(250),
            vec![],
            vec![],
            "a",
            Utc::now(),
        );
        assert_eq!(rec.difference, dec!(-150));
    }
}
