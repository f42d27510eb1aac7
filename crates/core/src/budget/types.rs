//! Budget control domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A budget estimate: the allocation a unit may spend against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetEstimate {
    /// Estimate id.
    pub id: Uuid,
    /// Estimate code, unique per fiscal year.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Fiscal year the estimate belongs to.
    pub fiscal_year: i32,
    /// Total allocated amount.
    pub allocated_amount: Decimal,
    /// Amount committed by approved but unpaid obligations.
    pub committed_amount: Decimal,
    /// Amount already spent.
    pub spent_amount: Decimal,
}

impl BudgetEstimate {
    /// Remaining spendable amount.
    #[must_use]
    pub fn available(&self) -> Decimal {
        self.allocated_amount - self.committed_amount - self.spent_amount
    }

    /// Copy of the estimate with `amount` removed from the spent total.
    ///
    /// Used when re-checking a voucher whose earlier posting already
    /// counts in the spent figure: the check must treat that earlier
    /// spending as reversed, or the voucher would compete against its
    /// own previous amount.
    #[must_use]
    pub fn excluding_spending(&self, amount: Decimal) -> Self {
        Self {
            spent_amount: self.spent_amount - amount,
            ..self.clone()
        }
    }
}

/// Per fiscal-year/period budget control settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetPeriod {
    /// Period id.
    pub id: Uuid,
    /// Fiscal year.
    pub fiscal_year: i32,
    /// Period number within the fiscal year (1-12).
    pub period: u32,
    /// Utilization ratio above which spending raises a warning.
    pub warning_threshold: Decimal,
    /// Utilization ratio above which spending is blocked.
    pub block_threshold: Decimal,
    /// When true, blocked spending may proceed with an approved
    /// authorization instead of being rejected outright.
    pub allow_override: bool,
    /// When true, no spending against this period is accepted at all.
    pub is_locked: bool,
}

/// Kind of an entry in the append-only budget transaction log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetTransactionKind {
    /// Increases the allocated amount.
    Allocation,
    /// Increases the committed amount.
    Commitment,
    /// Increases the spent amount.
    Spending,
    /// Decreases the spent amount, restoring utilization.
    Reversal,
}

impl BudgetTransactionKind {
    /// Parse a transaction kind from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ALLOCATION" => Some(Self::Allocation),
            "COMMITMENT" => Some(Self::Commitment),
            "SPENDING" => Some(Self::Spending),
            "REVERSAL" => Some(Self::Reversal),
            _ => None,
        }
    }

    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allocation => "ALLOCATION",
            Self::Commitment => "COMMITMENT",
            Self::Spending => "SPENDING",
            Self::Reversal => "REVERSAL",
        }
    }
}

/// One entry of the append-only budget transaction log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetTransaction {
    /// Transaction id.
    pub id: Uuid,
    /// Estimate the transaction applies to.
    pub estimate_id: Uuid,
    /// Transaction kind.
    pub kind: BudgetTransactionKind,
    /// Transaction amount (always positive; the kind decides the sign).
    pub amount: Decimal,
    /// Voucher that caused the transaction, if any.
    pub voucher_id: Option<Uuid>,
    /// Document number of that voucher.
    pub doc_no: Option<String>,
    /// Free-form description.
    pub description: String,
    /// Append timestamp.
    pub created_at: DateTime<Utc>,
}

/// Running balances produced by folding the transaction log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BudgetBalances {
    /// Allocated total.
    pub allocated: Decimal,
    /// Committed total.
    pub committed: Decimal,
    /// Spent total.
    pub spent: Decimal,
}

impl BudgetBalances {
    /// Applies one log entry to the balances.
    #[must_use]
    pub fn apply(mut self, kind: BudgetTransactionKind, amount: Decimal) -> Self {
        match kind {
            BudgetTransactionKind::Allocation => self.allocated += amount,
            BudgetTransactionKind::Commitment => self.committed += amount,
            BudgetTransactionKind::Spending => self.spent += amount,
            BudgetTransactionKind::Reversal => self.spent -= amount,
        }
        self
    }

    /// Folds an ordered log into final balances, starting from `base`.
    #[must_use]
    pub fn fold<'a, I>(base: Self, log: I) -> Self
    where
        I: IntoIterator<Item = &'a BudgetTransaction>,
    {
        log.into_iter()
            .fold(base, |acc, tx| acc.apply(tx.kind, tx.amount))
    }

    /// Remaining spendable amount.
    #[must_use]
    pub fn available(&self) -> Decimal {
        self.allocated - self.committed - self.spent
    }
}

/// Outcome class of a spending check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckStatus {
    /// Within the warning threshold.
    None,
    /// Above the warning threshold but within the block threshold.
    Warning,
    /// Above the block threshold (or no allocation at all).
    Blocked,
}

/// Full decision record returned by a spending check.
#[derive(Debug, Clone, Serialize)]
pub struct SpendingDecision {
    /// Whether the spending may proceed as-is.
    pub allowed: bool,
    /// Outcome class.
    pub status: CheckStatus,
    /// True when blocked spending may proceed with an approved
    /// authorization.
    pub requires_approval: bool,
    /// Amount still available before this spending.
    pub available: Decimal,
    /// Utilization ratio after this spending.
    pub new_utilization: Decimal,
    /// Human-readable explanation with the concrete amounts.
    pub message: String,
}

/// Authorization request lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthorizationStatus {
    /// Awaiting a decision.
    Pending,
    /// Approved; usable until expiry.
    Approved,
    /// Rejected with a reason.
    Rejected,
}

impl AuthorizationStatus {
    /// Parse a status from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "APPROVED" => Some(Self::Approved),
            "REJECTED" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

/// Alert severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertSeverity {
    /// Spending crossed the warning threshold.
    Warning,
    /// Spending was blocked or proceeded via override.
    Critical,
}

impl AlertSeverity {
    /// Parse a severity from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "WARNING" => Some(Self::Warning),
            "CRITICAL" => Some(Self::Critical),
            _ => None,
        }
    }

    /// Returns the string representation of the severity.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "WARNING",
            Self::Critical => "CRITICAL",
        }
    }
}

/// Alert lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertStatus {
    /// Newly raised.
    Active,
    /// Seen by an operator.
    Acknowledged,
    /// Closed with resolution notes.
    Resolved,
}

impl AlertStatus {
    /// Parse a status from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ACTIVE" => Some(Self::Active),
            "ACKNOWLEDGED" => Some(Self::Acknowledged),
            "RESOLVED" => Some(Self::Resolved),
            _ => None,
        }
    }

    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Acknowledged => "ACKNOWLEDGED",
            Self::Resolved => "RESOLVED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn tx(kind: BudgetTransactionKind, amount: Decimal) -> BudgetTransaction {
        BudgetTransaction {
            id: Uuid::new_v4(),
            estimate_id: Uuid::nil(),
            kind,
            amount,
            voucher_id: None,
            doc_no: None,
            description: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_fold_applies_all_kinds() {
        let log = [
            tx(BudgetTransactionKind::Allocation, dec!(1000000)),
            tx(BudgetTransactionKind::Commitment, dec!(100000)),
            tx(BudgetTransactionKind::Spending, dec!(400000)),
            tx(BudgetTransactionKind::Spending, dec!(50000)),
            tx(BudgetTransactionKind::Reversal, dec!(50000)),
        ];
        let balances = BudgetBalances::fold(BudgetBalances::default(), &log);
        assert_eq!(balances.allocated, dec!(1000000));
        assert_eq!(balances.committed, dec!(100000));
        assert_eq!(balances.spent, dec!(400000));
        assert_eq!(balances.available(), dec!(500000));
    }

    #[test]
    fn test_reversal_fully_restores_spending() {
        let base = BudgetBalances {
            allocated: dec!(100),
            committed: Decimal::ZERO,
            spent: Decimal::ZERO,
        };
        let after = base
            .apply(BudgetTransactionKind::Spending, dec!(40))
            .apply(BudgetTransactionKind::Reversal, dec!(40));
        assert_eq!(after, base);
    }

    #[test]
    fn test_kind_roundtrip() {
        for kind in [
            BudgetTransactionKind::Allocation,
            BudgetTransactionKind::Commitment,
            BudgetTransactionKind::Spending,
            BudgetTransactionKind::Reversal,
        ] {
            assert_eq!(BudgetTransactionKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(BudgetTransactionKind::parse("TRANSFER"), None);
    }
}
