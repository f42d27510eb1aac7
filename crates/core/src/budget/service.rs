//! Spending checks against budget estimates.

use rust_decimal::Decimal;

use crate::budget::error::BudgetError;
use crate::budget::types::{BudgetEstimate, BudgetPeriod, CheckStatus, SpendingDecision};

/// Default utilization ratio above which spending raises a warning.
pub const DEFAULT_WARNING_THRESHOLD: Decimal = Decimal::from_parts(8, 0, 0, false, 1);

/// Default utilization ratio above which spending is blocked.
pub const DEFAULT_BLOCK_THRESHOLD: Decimal = Decimal::ONE;

/// Stateless budget control rules. The caller loads the estimate and the
/// period settings; this service only decides.
pub struct BudgetService;

impl BudgetService {
    /// Checks a proposed spending against an estimate.
    ///
    /// Utilization after the spending is `(committed + spent + amount) /
    /// allocated`. At or below the warning threshold the spending passes
    /// silently; at or below the block threshold it passes with a warning;
    /// above it, the spending is blocked. When the period allows overrides,
    /// a blocked decision carries `requires_approval` instead of being
    /// final. A missing period row means default thresholds and no
    /// override.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::InvalidAmount` for a non-positive amount and
    /// `BudgetError::BudgetPeriodLocked` when the period is locked. All
    /// other outcomes, including blocked spending, come back as a
    /// [`SpendingDecision`].
    pub fn check_spending(
        estimate: &BudgetEstimate,
        period: Option<&BudgetPeriod>,
        amount: Decimal,
    ) -> Result<SpendingDecision, BudgetError> {
        if amount <= Decimal::ZERO {
            return Err(BudgetError::InvalidAmount(amount));
        }

        if let Some(period) = period {
            if period.is_locked {
                return Err(BudgetError::BudgetPeriodLocked {
                    fiscal_year: period.fiscal_year,
                    period: period.period,
                });
            }
        }

        let warning_threshold =
            period.map_or(DEFAULT_WARNING_THRESHOLD, |p| p.warning_threshold);
        let block_threshold = period.map_or(DEFAULT_BLOCK_THRESHOLD, |p| p.block_threshold);
        let allow_override = period.is_some_and(|p| p.allow_override);

        let available = estimate.available();
        let used_after = estimate.committed_amount + estimate.spent_amount + amount;

        let Some(new_utilization) = used_after.checked_div(estimate.allocated_amount) else {
            // Zero allocation: nothing may be spent.
            return Ok(SpendingDecision {
                allowed: false,
                status: CheckStatus::Blocked,
                requires_approval: false,
                available,
                new_utilization: Decimal::ZERO,
                message: format!(
                    "Estimate '{}' has no allocation; spending of {amount} blocked",
                    estimate.code
                ),
            });
        };

        if new_utilization <= warning_threshold {
            return Ok(SpendingDecision {
                allowed: true,
                status: CheckStatus::None,
                requires_approval: false,
                available,
                new_utilization,
                message: format!(
                    "Spending of {amount} accepted; utilization {new_utilization}"
                ),
            });
        }

        if new_utilization <= block_threshold {
            return Ok(SpendingDecision {
                allowed: true,
                status: CheckStatus::Warning,
                requires_approval: false,
                available,
                new_utilization,
                message: format!(
                    "Spending of {amount} brings utilization to {new_utilization}, above the warning threshold {warning_threshold}"
                ),
            });
        }

        Ok(SpendingDecision {
            allowed: false,
            status: CheckStatus::Blocked,
            requires_approval: allow_override,
            available,
            new_utilization,
            message: format!(
                "Spending of {amount} exceeds the budget: available {available}, utilization would reach {new_utilization}"
            ),
        })
    }
}
