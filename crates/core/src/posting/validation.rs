//! Voucher line validation and the balance rule.

use rust_decimal::Decimal;

use crate::posting::error::PostingError;
use crate::posting::types::{PostingTotals, VoucherLineInput, MAX_LINE_DIMS};

/// Maximum tolerated difference between on-balance debit and credit totals.
///
/// Covers rounding residue from VAT splits and allocation vouchers.
pub const BALANCE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Returns true if the account code denotes an off-balance-sheet account.
///
/// Off-balance-sheet accounts carry a code starting with "0" and are
/// posted single-entry: they never participate in the balance check.
#[must_use]
pub fn is_off_balance_sheet(account_code: &str) -> bool {
    account_code.starts_with('0')
}

fn validate_account_code(code: &str, side: &str, line_index: usize) -> Result<(), PostingError> {
    if code.trim().is_empty() {
        return Err(PostingError::InvalidLine {
            line_index,
            reason: format!("{side} account code is blank"),
        });
    }
    if !code.chars().all(|c| c.is_ascii_alphanumeric() || c == '.') {
        return Err(PostingError::InvalidLine {
            line_index,
            reason: format!("{side} account code '{code}' contains invalid characters"),
        });
    }
    Ok(())
}

/// Validates every line of a voucher and accumulates posting totals.
///
/// Each line must carry a positive amount and at least one account. A side
/// contributes to the on-balance totals only when its account is an
/// on-balance-sheet account; off-balance sides accumulate into separate
/// memo totals.
///
/// # Errors
///
/// Returns `PostingError::EmptyVoucher` for an empty line list,
/// `PostingError::InvalidLine` for a malformed line, and
/// `PostingError::UnbalancedVoucher` when the on-balance sides differ by
/// more than [`BALANCE_TOLERANCE`].
pub fn validate_lines(lines: &[VoucherLineInput]) -> Result<PostingTotals, PostingError> {
    if lines.is_empty() {
        return Err(PostingError::EmptyVoucher);
    }

    let mut totals = PostingTotals {
        debit_total: Decimal::ZERO,
        credit_total: Decimal::ZERO,
        off_balance_debit: Decimal::ZERO,
        off_balance_credit: Decimal::ZERO,
        line_count: lines.len(),
    };

    for (line_index, line) in lines.iter().enumerate() {
        if line.amount <= Decimal::ZERO {
            return Err(PostingError::InvalidLine {
                line_index,
                reason: format!("amount must be positive, got {}", line.amount),
            });
        }

        if line.debit_account.is_none() && line.credit_account.is_none() {
            return Err(PostingError::InvalidLine {
                line_index,
                reason: "line has neither a debit nor a credit account".to_string(),
            });
        }

        if line.tags.dims.len() > MAX_LINE_DIMS {
            return Err(PostingError::InvalidLine {
                line_index,
                reason: format!(
                    "line carries {} dimension codes, maximum is {MAX_LINE_DIMS}",
                    line.tags.dims.len()
                ),
            });
        }

        if let Some(debit) = &line.debit_account {
            validate_account_code(debit, "debit", line_index)?;
            if is_off_balance_sheet(debit) {
                totals.off_balance_debit += line.amount;
            } else {
                totals.debit_total += line.amount;
            }
        }

        if let Some(credit) = &line.credit_account {
            validate_account_code(credit, "credit", line_index)?;
            if is_off_balance_sheet(credit) {
                totals.off_balance_credit += line.amount;
            } else {
                totals.credit_total += line.amount;
            }
        }
    }

    if totals.imbalance() > BALANCE_TOLERANCE {
        return Err(PostingError::UnbalancedVoucher {
            debit: totals.debit_total,
            credit: totals.credit_total,
        });
    }

    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::posting::types::LineTags;
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

    #[test]
    fn test_empty_voucher_rejected() {
        assert!(matches!(
            validate_lines(&[]),
            Err(PostingError::EmptyVoucher)
        ));
    }

    #[test]
    fn test_balanced_two_sided_line() {
        let totals = validate_lines(&[line(Some("111"), Some("511"), dec!(1000))]).unwrap();
        assert_eq!(totals.debit_total, dec!(1000));
        assert_eq!(totals.credit_total, dec!(1000));
        assert_eq!(totals.off_balance_debit, Decimal::ZERO);
    }

    #[test]
    fn test_unbalanced_voucher_rejected() {
        let result = validate_lines(&[
            line(Some("111"), None, dec!(1000)),
            line(None, Some("511"), dec!(900)),
        ]);
        assert!(matches!(
            result,
            Err(PostingError::UnbalancedVoucher { .. })
        ));
    }

    #[test]
    fn test_imbalance_within_tolerance_accepted() {
        // 0.01 of rounding residue is allowed.
        let totals = validate_lines(&[
            line(Some("642"), None, dec!(333.33)),
            line(Some("133"), None, dec!(33.34)),
            line(None, Some("331"), dec!(366.66)),
        ])
        .unwrap();
        assert_eq!(totals.imbalance(), dec!(0.01));
    }

    #[test]
    fn test_imbalance_above_tolerance_rejected() {
        let result = validate_lines(&[
            line(Some("111"), None, dec!(100.02)),
            line(None, Some("511"), dec!(100.00)),
        ]);
        assert!(matches!(
            result,
            Err(PostingError::UnbalancedVoucher { .. })
        ));
    }

    #[test]
    fn test_off_balance_side_exempt_from_balance_check() {
        // Single-entry memo posting on an 00x account.
        let totals = validate_lines(&[line(Some("001"), None, dec!(50000))]).unwrap();
        assert_eq!(totals.debit_total, Decimal::ZERO);
        assert_eq!(totals.off_balance_debit, dec!(50000));
    }

    #[test]
    fn test_mixed_on_and_off_balance_lines() {
        let totals = validate_lines(&[
            line(Some("211"), Some("411"), dec!(80000)),
            line(None, Some("009"), dec!(80000)),
        ])
        .unwrap();
        assert_eq!(totals.debit_total, dec!(80000));
        assert_eq!(totals.credit_total, dec!(80000));
        assert_eq!(totals.off_balance_credit, dec!(80000));
    }

    #[test]
    fn test_zero_amount_rejected() {
        let result = validate_lines(&[line(Some("111"), Some("511"), Decimal::ZERO)]);
        assert!(matches!(
            result,
            Err(PostingError::InvalidLine { line_index: 0, .. })
        ));
    }

    #[test]
    fn test_negative_amount_rejected() {
        let result = validate_lines(&[line(Some("111"), Some("511"), dec!(-10))]);
        assert!(matches!(result, Err(PostingError::InvalidLine { .. })));
    }

    #[test]
    fn test_line_without_accounts_rejected() {
        let result = validate_lines(&[line(None, None, dec!(100))]);
        assert!(matches!(
            result,
            Err(PostingError::InvalidLine { line_index: 0, .. })
        ));
    }

    #[test]
    fn test_blank_account_code_rejected() {
        let result = validate_lines(&[line(Some("  "), Some("511"), dec!(100))]);
        assert!(matches!(result, Err(PostingError::InvalidLine { .. })));
    }

    #[test]
    fn test_account_code_with_invalid_chars_rejected() {
        let result = validate_lines(&[line(Some("111;DROP"), Some("511"), dec!(100))]);
        assert!(matches!(result, Err(PostingError::InvalidLine { .. })));
    }

    #[test]
    fn test_sub_account_code_accepted() {
        assert!(validate_lines(&[line(Some("111.1"), Some("511.2"), dec!(100))]).is_ok());
    }

    #[test]
    fn test_too_many_dims_rejected() {
        let mut l = line(Some("111"), Some("511"), dec!(100));
        l.tags.dims = vec!["D1".into(), "D2".into(), "D3".into(), "D4".into(), "D5".into(), "D6".into()];
        assert!(matches!(
            validate_lines(&[l]),
            Err(PostingError::InvalidLine { .. })
        ));
    }

    #[test]
    fn test_error_reports_offending_line_index() {
        let result = validate_lines(&[
            line(Some("111"), Some("511"), dec!(100)),
            line(Some("111"), Some("511"), dec!(-5)),
        ]);
        match result {
            Err(PostingError::InvalidLine { line_index, .. }) => assert_eq!(line_index, 1),
            other => panic!("expected InvalidLine, got {other:?}"),
        }
    }
}
