//! Pure posting service: header checks, line validation and expansion.

use chrono::{Months, NaiveDate};
use uuid::Uuid;

use crate::period;
use crate::posting::error::PostingError;
use crate::posting::expansion::{expand_lines, GeneralLedgerEntry};
use crate::posting::types::{PostingTotals, VoucherHeaderInput, VoucherLineInput};
use crate::posting::validation::validate_lines;

/// Outcome of a successful validation pass: the totals and the general
/// ledger rows ready to be written in one transaction.
#[derive(Debug)]
pub struct ValidatedPosting {
    /// Voucher id the rows belong to.
    pub voucher_id: Uuid,
    /// Accumulated totals.
    pub totals: PostingTotals,
    /// Expanded general ledger rows.
    pub entries: Vec<GeneralLedgerEntry>,
}

/// Stateless posting rules. All database access happens in the caller;
/// this service only decides whether a voucher may be posted and what
/// ledger rows it produces.
pub struct PostingService;

impl PostingService {
    /// Validates a voucher against the posting rules and expands its lines.
    ///
    /// Checks, in order: header sanity, the global ledger lock, then line
    /// validation with the balance rule, then double-entry expansion.
    ///
    /// # Errors
    ///
    /// Returns the first failing rule as a [`PostingError`].
    pub fn validate_voucher(
        header: &VoucherHeaderInput,
        lines: &[VoucherLineInput],
        locked_until: Option<NaiveDate>,
    ) -> Result<ValidatedPosting, PostingError> {
        Self::validate_header(header)?;
        period::check_posting_allowed(header.posting_date, locked_until)?;

        let totals = validate_lines(lines)?;
        let voucher_id = header.id.unwrap_or_else(Uuid::new_v4);
        let entries = expand_lines(
            voucher_id,
            &header.doc_no,
            header.posting_date,
            &header.description,
            lines,
        )?;

        Ok(ValidatedPosting {
            voucher_id,
            totals,
            entries,
        })
    }

    fn validate_header(header: &VoucherHeaderInput) -> Result<(), PostingError> {
        if header.doc_no.trim().is_empty() {
            return Err(PostingError::InvalidLine {
                line_index: 0,
                reason: "document number is blank".to_string(),
            });
        }
        if header.doc_no.len() > 50 {
            return Err(PostingError::InvalidLine {
                line_index: 0,
                reason: format!("document number exceeds 50 characters ({})", header.doc_no.len()),
            });
        }
        if header.posting_date < header.doc_date {
            return Err(PostingError::InvalidLine {
                line_index: 0,
                reason: format!(
                    "posting date {} precedes document date {}",
                    header.posting_date, header.doc_date
                ),
            });
        }
        Ok(())
    }

    /// Returns the same day-of-month in the next accounting period,
    /// clamped to the last day when the next month is shorter.
    ///
    /// # Errors
    ///
    /// Returns `PostingError::Internal` on date overflow.
    pub fn next_period_date(date: NaiveDate) -> Result<NaiveDate, PostingError> {
        date.checked_add_months(Months::new(1))
            .ok_or_else(|| PostingError::Internal(format!("date overflow advancing {date}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posting::types::{LineTags, VoucherType};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn header(doc_no: &str) -> VoucherHeaderInput {
        VoucherHeaderInput {
            id: None,
            doc_no: doc_no.to_string(),
            doc_date: date(2025, 6, 1),
            posting_date: date(2025, 6, 1),
            description: "test voucher".to_string(),
            voucher_type: VoucherType::General,
            original_doc_no: None,
            budget_estimate_id: None,
            fund_source_code: None,
            created_by: "tester".to_string(),
        }
    }

    fn line(debit: &str, credit: &str, amount: Decimal) -> VoucherLineInput {
        VoucherLineInput {
            debit_account: Some(debit.to_string()),
            credit_account: Some(credit.to_string()),
            amount,
            description: None,
            tags: LineTags::default(),
        }
    }

    #[test]
    fn test_valid_voucher_passes_and_expands() {
        let validated = PostingService::validate_voucher(
            &header("GL-001"),
            &[line("642", "111", dec!(500))],
            None,
        )
        .unwrap();

        assert_eq!(validated.totals.voucher_amount(), dec!(500));
        assert_eq!(validated.entries.len(), 2);
        assert_eq!(validated.entries[0].voucher_id, validated.voucher_id);
    }

    #[test]
    fn test_existing_id_preserved_on_update() {
        let id = Uuid::new_v4();
        let mut h = header("GL-002");
        h.id = Some(id);
        let validated =
            PostingService::validate_voucher(&h, &[line("642", "111", dec!(500))], None).unwrap();
        assert_eq!(validated.voucher_id, id);
    }

    #[test]
    fn test_locked_period_rejected_before_line_validation() {
        // Even an unbalanced voucher reports the lock first.
        let result = PostingService::validate_voucher(
            &header("GL-003"),
            &[line("642", "111", dec!(500))],
            Some(date(2025, 6, 30)),
        );
        assert!(matches!(result, Err(PostingError::PeriodLocked { .. })));
    }

    #[test]
    fn test_blank_doc_no_rejected() {
        let mut h = header(" ");
        h.doc_no = "  ".to_string();
        let result =
            PostingService::validate_voucher(&h, &[line("642", "111", dec!(500))], None);
        assert!(matches!(result, Err(PostingError::InvalidLine { .. })));
    }

    #[test]
    fn test_posting_before_doc_date_rejected() {
        let mut h = header("GL-004");
        h.posting_date = date(2025, 5, 31);
        let result =
            PostingService::validate_voucher(&h, &[line("642", "111", dec!(500))], None);
        assert!(matches!(result, Err(PostingError::InvalidLine { .. })));
    }

    #[test]
    fn test_next_period_date_clamps_to_month_end() {
        assert_eq!(
            PostingService::next_period_date(date(2025, 1, 31)).unwrap(),
            date(2025, 2, 28)
        );
        assert_eq!(
            PostingService::next_period_date(date(2025, 6, 15)).unwrap(),
            date(2025, 7, 15)
        );
    }
}
