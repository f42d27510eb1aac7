//! Double-entry expansion of voucher lines into general ledger rows.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::posting::error::PostingError;
use crate::posting::types::{LineTags, VoucherLineInput};

/// Which side of a voucher line a ledger row was generated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySide {
    /// Row generated for the debit side.
    Debit,
    /// Row generated for the credit side.
    Credit,
}

impl EntrySide {
    /// Single-letter suffix used in entry references.
    #[must_use]
    pub fn suffix(&self) -> char {
        match self {
            Self::Debit => 'D',
            Self::Credit => 'C',
        }
    }
}

/// A general ledger row produced by expanding a voucher line.
///
/// A two-sided line produces two rows, one per side; a single-sided memo
/// line produces one. `entry_ref` is deterministic and unique per voucher:
/// `"{doc_no}-{line_index}-{D|C}"`.
#[derive(Debug, Clone, Serialize)]
pub struct GeneralLedgerEntry {
    /// Deterministic entry reference.
    pub entry_ref: String,
    /// Voucher the row belongs to.
    pub voucher_id: Uuid,
    /// Zero-based index of the source line.
    pub line_index: usize,
    /// Side of the source line this row represents.
    pub side: EntrySide,
    /// Account this row posts to.
    pub account_code: String,
    /// Account on the opposite side of the source line, if any.
    pub counter_account: Option<String>,
    /// Posted amount.
    pub amount: Decimal,
    /// Posting date copied from the voucher header.
    pub posting_date: NaiveDate,
    /// Line description, falling back to the voucher description.
    pub description: String,
    /// Dimensional tags copied from the source line.
    pub tags: LineTags,
    /// True when `account_code` is an off-balance-sheet account.
    pub off_balance: bool,
}

/// Expands voucher lines into general ledger rows.
///
/// Lines must already have passed [`crate::posting::validate_lines`].
///
/// # Errors
///
/// Returns `PostingError::Internal` if a line has no account on either
/// side, which validation rules out.
pub fn expand_lines(
    voucher_id: Uuid,
    doc_no: &str,
    posting_date: NaiveDate,
    voucher_description: &str,
    lines: &[VoucherLineInput],
) -> Result<Vec<GeneralLedgerEntry>, PostingError> {
    let mut entries = Vec::with_capacity(lines.len() * 2);

    for (line_index, line) in lines.iter().enumerate() {
        let description = line
            .description
            .clone()
            .unwrap_or_else(|| voucher_description.to_string());

        if line.debit_account.is_none() && line.credit_account.is_none() {
            return Err(PostingError::Internal(format!(
                "line {line_index} reached expansion without any account"
            )));
        }

        if let Some(debit) = &line.debit_account {
            entries.push(GeneralLedgerEntry {
                entry_ref: format!("{doc_no}-{line_index}-D"),
                voucher_id,
                line_index,
                side: EntrySide::Debit,
                account_code: debit.clone(),
                counter_account: line.credit_account.clone(),
                amount: line.amount,
                posting_date,
                description: description.clone(),
                tags: line.tags.clone(),
                off_balance: crate::posting::validation::is_off_balance_sheet(debit),
            });
        }

        if let Some(credit) = &line.credit_account {
            entries.push(GeneralLedgerEntry {
                entry_ref: format!("{doc_no}-{line_index}-C"),
                voucher_id,
                line_index,
                side: EntrySide::Credit,
                account_code: credit.clone(),
                counter_account: line.debit_account.clone(),
                amount: line.amount,
                posting_date,
                description,
                tags: line.tags.clone(),
                off_balance: crate::posting::validation::is_off_balance_sheet(credit),
            });
        }
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(debit: Option<&str>, credit: Option<&str>, amount: Decimal) -> VoucherLineInput {
        VoucherLineInput {
            debit_account: debit.map(String::from),
            credit_account: credit.map(String::from),
            amount,
            description: None,
            tags: LineTags::default(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_two_sided_line_produces_two_rows() {
        let entries = expand_lines(
            Uuid::nil(),
            "PC-001",
            date(2025, 6, 1),
            "office supplies",
            &[line(Some("642"), Some("111"), dec!(250))],
        )
        .unwrap();

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].entry_ref, "PC-001-0-D");
        assert_eq!(entries[0].account_code, "642");
        assert_eq!(entries[0].counter_account.as_deref(), Some("111"));
        assert_eq!(entries[1].entry_ref, "PC-001-0-C");
        assert_eq!(entries[1].account_code, "111");
        assert_eq!(entries[1].counter_account.as_deref(), Some("642"));
        assert_eq!(entries[0].amount, entries[1].amount);
    }

    #[test]
    fn test_memo_line_produces_one_row() {
        let entries = expand_lines(
            Uuid::nil(),
            "GL-007",
            date(2025, 6, 1),
            "leased asset received",
            &[line(Some("001"), None, dec!(50000))],
        )
        .unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entry_ref, "GL-007-0-D");
        assert!(entries[0].off_balance);
        assert!(entries[0].counter_account.is_none());
    }

    #[test]
    fn test_entry_refs_unique_across_lines() {
        let entries = expand_lines(
            Uuid::nil(),
            "GL-010",
            date(2025, 6, 1),
            "multi-line",
            &[
                line(Some("642"), Some("111"), dec!(100)),
                line(Some("133"), Some("111"), dec!(10)),
            ],
        )
        .unwrap();

        let mut refs: Vec<&str> = entries.iter().map(|e| e.entry_ref.as_str()).collect();
        refs.sort_unstable();
        refs.dedup();
        assert_eq!(refs.len(), entries.len());
    }

    #[test]
    fn test_line_description_falls_back_to_voucher() {
        let mut l = line(Some("642"), Some("111"), dec!(100));
        l.description = Some("taxi fare".to_string());
        let entries = expand_lines(
            Uuid::nil(),
            "PC-002",
            date(2025, 6, 1),
            "travel expenses",
            &[l, line(Some("642"), Some("111"), dec!(50))],
        )
        .unwrap();

        assert_eq!(entries[0].description, "taxi fare");
        assert_eq!(entries[2].description, "travel expenses");
    }
}
