//! Property tests for line validation and expansion.

use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::posting::expansion::expand_lines;
use crate::posting::types::{LineTags, VoucherLineInput};
use crate::posting::validation::{validate_lines, BALANCE_TOLERANCE};

fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..=1_000_000_00).prop_map(|cents| Decimal::new(cents, 2))
}

fn arb_on_balance_account() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[1-9][0-9]{2}").unwrap()
}

fn arb_line() -> impl Strategy<Value = VoucherLineInput> {
    (arb_on_balance_account(), arb_on_balance_account(), arb_amount()).prop_map(
        |(debit, credit, amount)| VoucherLineInput {
            debit_account: Some(debit),
            credit_account: Some(credit),
            amount,
            description: None,
            tags: LineTags::default(),
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Two-sided lines on on-balance accounts always balance exactly.
    #[test]
    fn prop_two_sided_lines_always_balance(lines in prop::collection::vec(arb_line(), 1..10)) {
        let totals = validate_lines(&lines).unwrap();
        prop_assert_eq!(totals.debit_total, totals.credit_total);
        prop_assert!(totals.imbalance() <= BALANCE_TOLERANCE);
    }

    /// Expansion yields exactly two rows per two-sided line, with side
    /// amounts matching the source line.
    #[test]
    fn prop_expansion_row_count_and_amounts(lines in prop::collection::vec(arb_line(), 1..10)) {
        let entries = expand_lines(
            Uuid::nil(),
            "PT-001",
            chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            "prop voucher",
            &lines,
        ).unwrap();

        prop_assert_eq!(entries.len(), lines.len() * 2);
        for (i, l) in lines.iter().enumerate() {
            prop_assert_eq!(entries[i * 2].amount, l.amount);
            prop_assert_eq!(entries[i * 2 + 1].amount, l.amount);
        }
    }

    /// Entry references are unique within a voucher.
    #[test]
    fn prop_entry_refs_unique(lines in prop::collection::vec(arb_line(), 1..20)) {
        let entries = expand_lines(
            Uuid::nil(),
            "PT-002",
            chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            "prop voucher",
            &lines,
        ).unwrap();

        let mut refs: Vec<&str> = entries.iter().map(|e| e.entry_ref.as_str()).collect();
        let total = refs.len();
        refs.sort_unstable();
        refs.dedup();
        prop_assert_eq!(refs.len(), total);
    }

    /// A skewed pair of one-sided lines is rejected whenever the skew
    /// exceeds the tolerance.
    #[test]
    fn prop_skew_beyond_tolerance_rejected(
        base in 100i64..1_000_000,
        skew_cents in 2i64..10_000,
    ) {
        let debit = VoucherLineInput {
            debit_account: Some("642".to_string()),
            credit_account: None,
            amount: Decimal::new(base * 100 + skew_cents, 2),
            description: None,
            tags: LineTags::default(),
        };
        let credit = VoucherLineInput {
            debit_account: None,
            credit_account: Some("111".to_string()),
            amount: Decimal::new(base * 100, 2),
            description: None,
            tags: LineTags::default(),
        };
        prop_assert!(validate_lines(&[debit, credit]).is_err());
    }
}
