//! Property tests for the spending check and the transaction log fold.

use proptest::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::budget::service::BudgetService;
use crate::budget::types::{
    BudgetBalances, BudgetEstimate, BudgetTransactionKind, CheckStatus,
};

fn arb_money() -> impl Strategy<Value = Decimal> {
    (0i64..=10_000_000_00).prop_map(|cents| Decimal::new(cents, 2))
}

fn arb_estimate() -> impl Strategy<Value = BudgetEstimate> {
    (arb_money(), arb_money(), arb_money()).prop_map(|(allocated, committed, spent)| {
        BudgetEstimate {
            id: Uuid::nil(),
            code: "EST-PT".to_string(),
            name: "prop estimate".to_string(),
            fiscal_year: 2025,
            allocated_amount: allocated,
            committed_amount: committed,
            spent_amount: spent,
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// The decision is internally consistent: blocked decisions are never
    /// allowed, and non-blocked ones always are.
    #[test]
    fn prop_allowed_matches_status(est in arb_estimate(), amount in 1i64..=1_000_000_00) {
        let amount = Decimal::new(amount, 2);
        let decision = BudgetService::check_spending(&est, None, amount).unwrap();
        match decision.status {
            CheckStatus::Blocked => prop_assert!(!decision.allowed),
            CheckStatus::None | CheckStatus::Warning => prop_assert!(decision.allowed),
        }
        // No override path without a period row.
        prop_assert!(!decision.requires_approval);
    }

    /// Available amount reported by the decision matches the estimate.
    #[test]
    fn prop_available_matches_estimate(est in arb_estimate(), amount in 1i64..=1_000_000_00) {
        let amount = Decimal::new(amount, 2);
        let decision = BudgetService::check_spending(&est, None, amount).unwrap();
        prop_assert_eq!(decision.available, est.available());
    }

    /// A SPENDING followed by a matching REVERSAL leaves the balances
    /// exactly where they started.
    #[test]
    fn prop_reversal_cancels_spending(
        allocated in arb_money(),
        spent in arb_money(),
        amount in arb_money(),
    ) {
        let base = BudgetBalances {
            allocated,
            committed: Decimal::ZERO,
            spent,
        };
        let after = base
            .apply(BudgetTransactionKind::Spending, amount)
            .apply(BudgetTransactionKind::Reversal, amount);
        prop_assert_eq!(after, base);
    }

    /// Folding is order-insensitive for the final balances.
    #[test]
    fn prop_fold_is_commutative(amounts in prop::collection::vec(arb_money(), 1..10)) {
        let forward = amounts.iter().fold(BudgetBalances::default(), |acc, a| {
            acc.apply(BudgetTransactionKind::Spending, *a)
        });
        let backward = amounts.iter().rev().fold(BudgetBalances::default(), |acc, a| {
            acc.apply(BudgetTransactionKind::Spending, *a)
        });
        prop_assert_eq!(forward, backward);
    }
}
