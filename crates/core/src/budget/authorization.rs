//! Authorization workflow for over-budget spending.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::actor::ActorRole;
use crate::budget::error::BudgetError;
use crate::budget::types::AuthorizationStatus;

/// A request to spend past the block threshold, decided by an elevated
/// role.
#[derive(Debug, Clone)]
pub struct BudgetAuthorization {
    /// Authorization id.
    pub id: Uuid,
    /// Estimate the spending draws from.
    pub estimate_id: Uuid,
    /// Requested spending amount.
    pub requested_amount: Decimal,
    /// Amount actually approved; may be lower than requested.
    pub approved_amount: Option<Decimal>,
    /// Availability at request time, recorded for the approver.
    pub available_snapshot: Decimal,
    /// Lifecycle status.
    pub status: AuthorizationStatus,
    /// Actor who requested the authorization.
    pub requested_by: String,
    /// Actor who approved or rejected it.
    pub decided_by: Option<String>,
    /// Rejection reason.
    pub reason: Option<String>,
    /// Justification supplied by the requester.
    pub justification: String,
    /// Instant past which the request can no longer be decided or used.
    pub expires_at: DateTime<Utc>,
    /// Request timestamp.
    pub created_at: DateTime<Utc>,
}

impl BudgetAuthorization {
    /// Creates a new pending authorization request.
    ///
    /// # Errors
    ///
    /// Returns `BudgetError::InvalidAmount` for a non-positive amount and
    /// `BudgetError::ReasonRequired` for a blank justification.
    pub fn new_request(
        estimate_id: Uuid,
        requested_amount: Decimal,
        available_snapshot: Decimal,
        requested_by: &str,
        justification: &str,
        now: DateTime<Utc>,
        expiry_hours: i64,
    ) -> Result<Self, BudgetError> {
        if requested_amount <= Decimal::ZERO {
            return Err(BudgetError::InvalidAmount(requested_amount));
        }
        if justification.trim().is_empty() {
            return Err(BudgetError::ReasonRequired);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            estimate_id,
            requested_amount,
            approved_amount: None,
            available_snapshot,
            status: AuthorizationStatus::Pending,
            requested_by: requested_by.to_string(),
            decided_by: None,
            reason: None,
            justification: justification.to_string(),
            expires_at: now + Duration::hours(expiry_hours),
            created_at: now,
        })
    }

    /// Approves the request, optionally adjusting the approved amount.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for a non-elevated role,
    /// `AuthorizationNotPending` when already decided,
    /// `AuthorizationExpired` past the expiry and `InvalidAmount` for a
    /// non-positive adjusted amount.
    pub fn approve(
        &mut self,
        role: ActorRole,
        approved_amount: Option<Decimal>,
        decided_by: &str,
        now: DateTime<Utc>,
    ) -> Result<(), BudgetError> {
        self.check_decidable(role, now)?;
        if let Some(amount) = approved_amount {
            if amount <= Decimal::ZERO {
                return Err(BudgetError::InvalidAmount(amount));
            }
        }
        self.status = AuthorizationStatus::Approved;
        self.approved_amount = Some(approved_amount.unwrap_or(self.requested_amount));
        self.decided_by = Some(decided_by.to_string());
        Ok(())
    }

    /// Rejects the request with a mandatory reason.
    ///
    /// # Errors
    ///
    /// Returns `ReasonRequired` for a blank reason, plus the same
    /// decidability errors as [`Self::approve`].
    pub fn reject(
        &mut self,
        role: ActorRole,
        reason: &str,
        decided_by: &str,
        now: DateTime<Utc>,
    ) -> Result<(), BudgetError> {
        self.check_decidable(role, now)?;
        if reason.trim().is_empty() {
            return Err(BudgetError::ReasonRequired);
        }
        self.status = AuthorizationStatus::Rejected;
        self.reason = Some(reason.to_string());
        self.decided_by = Some(decided_by.to_string());
        Ok(())
    }

    fn check_decidable(&self, role: ActorRole, now: DateTime<Utc>) -> Result<(), BudgetError> {
        if !role.can_approve_authorization() {
            return Err(BudgetError::Forbidden(role.as_str().to_string()));
        }
        if self.status != AuthorizationStatus::Pending {
            return Err(BudgetError::AuthorizationNotPending {
                id: self.id,
                status: self.status.as_str().to_string(),
            });
        }
        if now >= self.expires_at {
            return Err(BudgetError::AuthorizationExpired(self.id));
        }
        Ok(())
    }

    /// True when this authorization covers a spending of `amount` at `now`.
    #[must_use]
    pub fn covers(&self, amount: Decimal, now: DateTime<Utc>) -> bool {
        self.status == AuthorizationStatus::Approved
            && now < self.expires_at
            && self.approved_amount.unwrap_or(self.requested_amount) >= amount
    }
}
