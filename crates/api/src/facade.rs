//! Voucher lifecycle façade.
//!
//! One logical operation per create/update/delete request: the lock and
//! budget checks run first, the ledger write is atomic, and the budget
//! transactions plus the audit record follow best-effort. A failure in a
//! best-effort step is logged at `warn` and never fails the primary
//! operation. Updates and deletes reverse the spending the voucher's
//! previous posting recorded, so the budget log folds to at most one
//! SPENDING per live voucher. The lock and budget checks run outside
//! the posting transaction, so a concurrent lock move can slip between
//! check and write.

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use socai_core::audit::{AuditAction, AuditRecordContent, AuditTrailRecord};
use socai_core::budget::{
    BudgetAlert, BudgetError, BudgetService, BudgetTransactionKind, SpendingDecision,
};
use socai_core::period::check_posting_allowed;
use socai_core::posting::{
    PostingError, PostingMode, PostingService, VoucherHeaderInput, VoucherLineInput, VoucherStatus,
};
use socai_db::repositories::{
    AuditRepository, BudgetRepository, PeriodRepository, VoucherRepository, VoucherWithLines,
};

use crate::error::ApiError;

/// Outcome of a save operation, returned to the HTTP layer.
#[derive(Debug)]
pub struct SaveOutcome {
    /// Id of the saved voucher.
    pub voucher_id: Uuid,
    /// Document number of the saved voucher.
    pub doc_no: String,
    /// Budget decision, present when the budget gate ran.
    pub budget_check: Option<SpendingDecision>,
}

/// Orchestrates posting, budget control and audit for one voucher
/// operation.
pub struct VoucherLifecycle {
    vouchers: VoucherRepository,
    budget: BudgetRepository,
    audit: AuditRepository,
    periods: PeriodRepository,
}

impl VoucherLifecycle {
    /// Creates a façade over one connection pool.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            vouchers: VoucherRepository::new(db.clone()),
            budget: BudgetRepository::new(db.clone()),
            audit: AuditRepository::new(db.clone()),
            periods: PeriodRepository::new(db),
        }
    }

    /// Saves a voucher: create when the header carries no id, full
    /// replace otherwise.
    ///
    /// # Errors
    ///
    /// Returns the first failing rule: period lock, line validation,
    /// budget block or the database write.
    pub async fn save(
        &self,
        header: &VoucherHeaderInput,
        lines: &[VoucherLineInput],
    ) -> Result<SaveOutcome, ApiError> {
        let locked_until = self.periods.locked_until().await?;
        let validated = PostingService::validate_voucher(header, lines, locked_until)?;

        let mode = if header.id.is_some() {
            PostingMode::Update
        } else {
            PostingMode::Create
        };

        let before = match mode {
            PostingMode::Update => Some(self.vouchers.find_by_id(validated.voucher_id).await?),
            PostingMode::Create => None,
        };

        let budget_check = self
            .run_budget_gate(header, validated.totals.voucher_amount(), before.as_ref())
            .await?;

        let saved = self
            .vouchers
            .save_posted(header, lines, &validated, mode)
            .await?;

        // A re-save supersedes the spending its previous posting logged;
        // reverse it before appending the new amount so the log always
        // folds to one SPENDING per live voucher.
        if let Some(prior) = &before {
            self.reverse_spending(prior, "reversal for superseded posting of voucher")
                .await;
        }
        if let (Some(decision), Some(estimate_id)) = (&budget_check, header.budget_estimate_id) {
            self.record_spending(estimate_id, &validated, &saved.doc_no, decision)
                .await;
        }

        let after = match self.vouchers.find_by_id(saved.id).await {
            Ok(voucher) => Some(voucher),
            Err(e) => {
                warn!(error = %e, voucher_id = %saved.id, "failed to re-read voucher for audit");
                None
            }
        };
        self.log_voucher_audit(
            match mode {
                PostingMode::Create => AuditAction::Create,
                PostingMode::Update => AuditAction::Update,
            },
            saved.id,
            &header.created_by,
            before.as_ref(),
            after.as_ref(),
        )
        .await;

        Ok(SaveOutcome {
            voucher_id: saved.id,
            doc_no: saved.doc_no,
            budget_check,
        })
    }

    /// Deletes a voucher after re-checking the period lock with the
    /// voucher's own posting date.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id and `PeriodLocked` when the
    /// voucher sits in the locked range.
    pub async fn delete(&self, id: Uuid, actor: &str) -> Result<(), ApiError> {
        let existing = self.vouchers.find_by_id(id).await?;
        let locked_until = self.periods.locked_until().await?;
        check_posting_allowed(existing.voucher.posting_date, locked_until)
            .map_err(PostingError::from)?;

        let deleted = self.vouchers.delete_voucher(id).await?;

        self.reverse_spending(&deleted, "reversal for deleted voucher")
            .await;
        self.log_voucher_audit(AuditAction::Delete, id, actor, Some(&deleted), None)
            .await;

        Ok(())
    }

    /// Duplicates a voucher into a new draft.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown source id.
    pub async fn duplicate(&self, id: Uuid, actor: &str) -> Result<VoucherWithLines, ApiError> {
        let draft = self.vouchers.duplicate_as_draft(id, actor).await?;
        self.log_voucher_audit(AuditAction::Create, draft.voucher.id, actor, None, Some(&draft))
            .await;
        Ok(draft)
    }

    /// The SPENDING a voucher's stored state contributed to its
    /// estimate: present only for posted, expense-classified vouchers
    /// that reference an estimate.
    fn recorded_spending(voucher: &VoucherWithLines) -> Option<(Uuid, Decimal)> {
        let estimate_id = voucher.voucher.budget_estimate_id?;
        let is_expense = socai_core::posting::VoucherType::parse(&voucher.voucher.voucher_type)
            .is_some_and(|t| t.is_expense());
        let is_posted = VoucherStatus::parse(&voucher.voucher.status)
            .is_some_and(|s| s.has_ledger_effect());
        (is_expense && is_posted).then_some((estimate_id, voucher.voucher.total_amount))
    }

    /// Runs the budget gate for expense-classified vouchers that draw
    /// from an estimate. Returns the decision when the gate ran.
    ///
    /// On a re-save the voucher's earlier posting already sits in the
    /// estimate's spent figure; the check runs as if that earlier
    /// spending were reversed.
    async fn run_budget_gate(
        &self,
        header: &VoucherHeaderInput,
        amount: Decimal,
        prior: Option<&VoucherWithLines>,
    ) -> Result<Option<SpendingDecision>, ApiError> {
        let Some(estimate_id) = header.budget_estimate_id else {
            return Ok(None);
        };
        if !header.voucher_type.is_expense() {
            return Ok(None);
        }

        let prior_spending = prior
            .and_then(Self::recorded_spending)
            .filter(|(prior_estimate, _)| *prior_estimate == estimate_id)
            .map_or(Decimal::ZERO, |(_, prior_amount)| prior_amount);

        let estimate = self
            .budget
            .find_estimate(estimate_id)
            .await?
            .excluding_spending(prior_spending);
        let period = self
            .periods
            .find_period(header.posting_date.year(), header.posting_date.month())
            .await?;

        let decision = BudgetService::check_spending(&estimate, period.as_ref(), amount)?;

        if !decision.allowed {
            if decision.requires_approval {
                let authorization = self
                    .budget
                    .find_covering_authorization(estimate_id, amount, Utc::now())
                    .await?;
                if authorization.is_none() {
                    return Err(BudgetError::AuthorizationRequired { requested: amount }.into());
                }
            } else {
                return Err(BudgetError::BudgetExceeded {
                    requested: amount,
                    available: decision.available,
                }
                .into());
            }
        }

        Ok(Some(decision))
    }

    /// Best-effort: append the SPENDING transaction and raise the alert
    /// the decision calls for.
    async fn record_spending(
        &self,
        estimate_id: Uuid,
        validated: &socai_core::posting::ValidatedPosting,
        doc_no: &str,
        decision: &SpendingDecision,
    ) {
        let result = self
            .budget
            .record_transaction(
                estimate_id,
                BudgetTransactionKind::Spending,
                validated.totals.voucher_amount(),
                Some(validated.voucher_id),
                Some(doc_no),
                &format!("spending posted by voucher {doc_no}"),
            )
            .await;
        if let Err(e) = result {
            warn!(error = %e, %doc_no, "failed to record budget spending transaction");
        }

        if let Some(alert) = BudgetAlert::from_decision(estimate_id, decision, Utc::now()) {
            if let Err(e) = self.budget.insert_alert(&alert).await {
                warn!(error = %e, %doc_no, "failed to raise budget alert");
            }
        }
    }

    /// Best-effort: append a REVERSAL undoing the SPENDING the voucher's
    /// stored state contributed, if any.
    async fn reverse_spending(&self, voucher: &VoucherWithLines, memo: &str) {
        let Some((estimate_id, amount)) = Self::recorded_spending(voucher) else {
            return;
        };

        let doc_no = &voucher.voucher.doc_no;
        let result = self
            .budget
            .record_transaction(
                estimate_id,
                BudgetTransactionKind::Reversal,
                amount,
                Some(voucher.voucher.id),
                Some(doc_no),
                &format!("{memo} {doc_no}"),
            )
            .await;
        if let Err(e) = result {
            warn!(error = %e, %doc_no, "failed to record budget reversal");
        }
    }

    /// Best-effort: append one audit record for the mutation.
    async fn log_voucher_audit(
        &self,
        action: AuditAction,
        voucher_id: Uuid,
        actor: &str,
        before: Option<&VoucherWithLines>,
        after: Option<&VoucherWithLines>,
    ) {
        // Flatten the header so updates diff at the field level.
        let snapshot = |v: &VoucherWithLines| {
            let mut value = serde_json::to_value(&v.voucher).unwrap_or_else(|_| json!({}));
            if let Some(map) = value.as_object_mut() {
                map.insert(
                    "lines".to_string(),
                    serde_json::to_value(&v.lines).unwrap_or_else(|_| json!([])),
                );
            }
            value
        };

        let record = AuditTrailRecord::seal(AuditRecordContent {
            entity_type: "voucher".to_string(),
            entity_id: voucher_id.to_string(),
            action,
            actor: actor.to_string(),
            reason: None,
            before: before.map(snapshot),
            after: after.map(snapshot),
            changed_fields: vec![],
            occurred_at: Utc::now(),
        });

        if let Err(e) = self.audit.append(&record).await {
            warn!(error = %e, %voucher_id, "failed to append audit record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use socai_db::entities::vouchers;

    fn stored_voucher(
        voucher_type: &str,
        status: &str,
        estimate_id: Option<Uuid>,
    ) -> VoucherWithLines {
        let now = Utc::now();
        let day = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        VoucherWithLines {
            voucher: vouchers::Model {
                id: Uuid::new_v4(),
                doc_no: "UNC-2025-014".to_string(),
                doc_date: day,
                posting_date: day,
                description: "office supplies".to_string(),
                voucher_type: voucher_type.to_string(),
                status: status.to_string(),
                original_doc_no: None,
                budget_estimate_id: estimate_id,
                fund_source_code: None,
                total_amount: dec!(100000),
                created_by: "tester".to_string(),
                created_at: now.into(),
                updated_at: now.into(),
            },
            lines: vec![],
        }
    }

    #[test]
    fn test_posted_expense_counts_as_recorded_spending() {
        let estimate_id = Uuid::new_v4();
        let prior = stored_voucher("bank_out", "posted", Some(estimate_id));
        assert_eq!(
            VoucherLifecycle::recorded_spending(&prior),
            Some((estimate_id, dec!(100000)))
        );
    }

    #[test]
    fn test_no_recorded_spending_without_estimate() {
        let prior = stored_voucher("bank_out", "posted", None);
        assert!(VoucherLifecycle::recorded_spending(&prior).is_none());
    }

    #[test]
    fn test_no_recorded_spending_for_draft_or_receipt() {
        let estimate_id = Uuid::new_v4();
        let draft = stored_voucher("bank_out", "draft", Some(estimate_id));
        assert!(VoucherLifecycle::recorded_spending(&draft).is_none());

        let receipt = stored_voucher("bank_in", "posted", Some(estimate_id));
        assert!(VoucherLifecycle::recorded_spending(&receipt).is_none());
    }
}
