//! Voucher domain types for posting and validation.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Voucher type classification.
///
/// A closed set: every route and rule matches exhaustively on this enum,
/// never on raw strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherType {
    /// General journal voucher.
    General,
    /// Cash receipt.
    CashIn,
    /// Cash payment.
    CashOut,
    /// Bank deposit / incoming transfer.
    BankIn,
    /// Bank payment / outgoing transfer.
    BankOut,
    /// Purchase voucher.
    Purchase,
    /// Sales voucher.
    Sale,
    /// Period-closing voucher.
    Closing,
    /// Cost allocation voucher.
    Allocation,
    /// Fixed asset depreciation voucher.
    Depreciation,
    /// Opening balance voucher.
    OpeningBalance,
}

impl VoucherType {
    /// Parse a voucher type from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "general" => Some(Self::General),
            "cash_in" => Some(Self::CashIn),
            "cash_out" => Some(Self::CashOut),
            "bank_in" => Some(Self::BankIn),
            "bank_out" => Some(Self::BankOut),
            "purchase" => Some(Self::Purchase),
            "sale" => Some(Self::Sale),
            "closing" => Some(Self::Closing),
            "allocation" => Some(Self::Allocation),
            "depreciation" => Some(Self::Depreciation),
            "opening_balance" => Some(Self::OpeningBalance),
            _ => None,
        }
    }

    /// Returns the string representation of the voucher type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::CashIn => "cash_in",
            Self::CashOut => "cash_out",
            Self::BankIn => "bank_in",
            Self::BankOut => "bank_out",
            Self::Purchase => "purchase",
            Self::Sale => "sale",
            Self::Closing => "closing",
            Self::Allocation => "allocation",
            Self::Depreciation => "depreciation",
            Self::OpeningBalance => "opening_balance",
        }
    }

    /// Returns true if vouchers of this type spend money and are subject
    /// to the budget gate when they reference a budget estimate.
    #[must_use]
    pub fn is_expense(&self) -> bool {
        matches!(self, Self::CashOut | Self::BankOut | Self::Purchase)
    }

    /// Returns true if vouchers of this type bring money into a fund.
    /// Types that are neither receipts nor expenses do not move fund
    /// balances.
    #[must_use]
    pub fn is_receipt(&self) -> bool {
        matches!(
            self,
            Self::CashIn | Self::BankIn | Self::Sale | Self::OpeningBalance
        )
    }
}

/// Voucher lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoucherStatus {
    /// Entered but not posted; no ledger effect.
    Draft,
    /// Posted to the general ledger.
    Posted,
    /// Cancelled; kept for reference, no ledger effect.
    Cancelled,
}

impl VoucherStatus {
    /// Parse a status from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "posted" => Some(Self::Posted),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Posted => "posted",
            Self::Cancelled => "cancelled",
        }
    }

    /// Returns true if vouchers in this status carry general ledger rows.
    #[must_use]
    pub fn has_ledger_effect(&self) -> bool {
        matches!(self, Self::Posted)
    }
}

/// Whether a posting request creates a new voucher or replaces an
/// existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostingMode {
    /// Insert a new voucher.
    Create,
    /// Full replace of an existing voucher's header, lines and ledger rows.
    Update,
}

/// Dimensional tags carried by a voucher line.
///
/// All tags are optional; `dims` holds up to five generic dimension codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTags {
    /// Partner (customer/vendor) code.
    #[serde(default)]
    pub partner_code: Option<String>,
    /// Project code.
    #[serde(default)]
    pub project_code: Option<String>,
    /// Contract code.
    #[serde(default)]
    pub contract_code: Option<String>,
    /// Statistical item code.
    #[serde(default)]
    pub item_code: Option<String>,
    /// Statistical sub-item code.
    #[serde(default)]
    pub sub_item_code: Option<String>,
    /// Fund source code.
    #[serde(default)]
    pub fund_source_code: Option<String>,
    /// Budget estimate this line draws from.
    #[serde(default)]
    pub budget_estimate_id: Option<Uuid>,
    /// Generic dimension codes (at most five).
    #[serde(default)]
    pub dims: Vec<String>,
}

/// Maximum number of generic dimension codes per line.
pub const MAX_LINE_DIMS: usize = 5;

/// Input for a single voucher line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherLineInput {
    /// Debit account code (at least one of debit/credit must be present).
    pub debit_account: Option<String>,
    /// Credit account code.
    pub credit_account: Option<String>,
    /// Line amount (must be positive).
    pub amount: Decimal,
    /// Optional line description.
    #[serde(default)]
    pub description: Option<String>,
    /// Dimensional tags.
    #[serde(default)]
    pub tags: LineTags,
}

/// Input for a voucher header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoucherHeaderInput {
    /// Existing voucher id; present for updates, absent for creates.
    pub id: Option<Uuid>,
    /// Document number, unique per voucher.
    pub doc_no: String,
    /// Document date.
    pub doc_date: NaiveDate,
    /// Posting date, checked against the ledger lock.
    pub posting_date: NaiveDate,
    /// Voucher description.
    pub description: String,
    /// Voucher type.
    pub voucher_type: VoucherType,
    /// Document number of the original voucher, for corrections/reversals.
    #[serde(default)]
    pub original_doc_no: Option<String>,
    /// Budget estimate the voucher spends against.
    #[serde(default)]
    pub budget_estimate_id: Option<Uuid>,
    /// Fund source code.
    #[serde(default)]
    pub fund_source_code: Option<String>,
    /// Actor entering the voucher.
    pub created_by: String,
}

/// Totals computed while validating a voucher's lines.
///
/// On-balance-sheet sides feed the balance check; off-balance-sheet sides
/// are memo totals reported separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostingTotals {
    /// Sum of debit amounts on on-balance-sheet accounts.
    pub debit_total: Decimal,
    /// Sum of credit amounts on on-balance-sheet accounts.
    pub credit_total: Decimal,
    /// Sum of debit amounts on off-balance-sheet accounts (memo).
    pub off_balance_debit: Decimal,
    /// Sum of credit amounts on off-balance-sheet accounts (memo).
    pub off_balance_credit: Decimal,
    /// Number of lines validated.
    pub line_count: usize,
}

impl PostingTotals {
    /// Total voucher amount: the larger of the two on-balance sides, or the
    /// memo total for pure off-balance vouchers.
    #[must_use]
    pub fn voucher_amount(&self) -> Decimal {
        let on_balance = self.debit_total.max(self.credit_total);
        if on_balance.is_zero() {
            self.off_balance_debit.max(self.off_balance_credit)
        } else {
            on_balance
        }
    }

    /// Absolute difference between the on-balance debit and credit sides.
    #[must_use]
    pub fn imbalance(&self) -> Decimal {
        (self.debit_total - self.credit_total).abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_voucher_type_roundtrip() {
        for t in [
            VoucherType::General,
            VoucherType::CashIn,
            VoucherType::CashOut,
            VoucherType::BankIn,
            VoucherType::BankOut,
            VoucherType::Purchase,
            VoucherType::Sale,
            VoucherType::Closing,
            VoucherType::Allocation,
            VoucherType::Depreciation,
            VoucherType::OpeningBalance,
        ] {
            assert_eq!(VoucherType::parse(t.as_str()), Some(t));
        }
        assert_eq!(VoucherType::parse("petty_cash"), None);
    }

    #[test]
    fn test_expense_classification() {
        assert!(VoucherType::CashOut.is_expense());
        assert!(VoucherType::BankOut.is_expense());
        assert!(VoucherType::Purchase.is_expense());

        assert!(!VoucherType::CashIn.is_expense());
        assert!(!VoucherType::Sale.is_expense());
        assert!(!VoucherType::General.is_expense());
        assert!(!VoucherType::OpeningBalance.is_expense());
    }

    #[test]
    fn test_receipt_classification() {
        assert!(VoucherType::CashIn.is_receipt());
        assert!(VoucherType::BankIn.is_receipt());
        assert!(VoucherType::Sale.is_receipt());
        assert!(VoucherType::OpeningBalance.is_receipt());

        assert!(!VoucherType::CashOut.is_receipt());
        assert!(!VoucherType::General.is_receipt());
        assert!(!VoucherType::Depreciation.is_receipt());
    }

    #[test]
    fn test_status_ledger_effect() {
        assert!(VoucherStatus::Posted.has_ledger_effect());
        assert!(!VoucherStatus::Draft.has_ledger_effect());
        assert!(!VoucherStatus::Cancelled.has_ledger_effect());
    }

    #[test]
    fn test_voucher_amount_prefers_on_balance() {
        let totals = PostingTotals {
            debit_total: dec!(500),
            credit_total: dec!(500),
            off_balance_debit: dec!(9000),
            off_balance_credit: dec!(0),
            line_count: 3,
        };
        assert_eq!(totals.voucher_amount(), dec!(500));

        let memo_only = PostingTotals {
            debit_total: dec!(0),
            credit_total: dec!(0),
            off_balance_debit: dec!(9000),
            off_balance_credit: dec!(0),
            line_count: 1,
        };
        assert_eq!(memo_only.voucher_amount(), dec!(9000));
    }
}
