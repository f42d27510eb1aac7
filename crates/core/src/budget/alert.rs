//! Budget alert lifecycle.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::budget::error::BudgetError;
use crate::budget::types::{AlertSeverity, AlertStatus, CheckStatus, SpendingDecision};

/// An alert raised by a spending check that crossed a threshold.
#[derive(Debug, Clone)]
pub struct BudgetAlert {
    /// Alert id.
    pub id: Uuid,
    /// Estimate the alert concerns.
    pub estimate_id: Uuid,
    /// Severity.
    pub severity: AlertSeverity,
    /// Lifecycle status.
    pub status: AlertStatus,
    /// Utilization ratio at the time the alert was raised.
    pub utilization: Decimal,
    /// Alert message with the concrete amounts.
    pub message: String,
    /// Actor who acknowledged the alert.
    pub acknowledged_by: Option<String>,
    /// Resolution notes.
    pub resolution_notes: Option<String>,
    /// Raise timestamp.
    pub created_at: DateTime<Utc>,
}

impl BudgetAlert {
    /// Builds the alert a spending decision calls for, if any.
    ///
    /// A `Warning` decision raises a Warning alert; a `Blocked` decision
    /// with an override path raises a Critical one. Plain blocks raise
    /// nothing, the rejection itself is the signal.
    #[must_use]
    pub fn from_decision(
        estimate_id: Uuid,
        decision: &SpendingDecision,
        now: DateTime<Utc>,
    ) -> Option<Self> {
        let severity = match decision.status {
            CheckStatus::Warning => AlertSeverity::Warning,
            CheckStatus::Blocked if decision.requires_approval => AlertSeverity::Critical,
            CheckStatus::None | CheckStatus::Blocked => return None,
        };
        Some(Self {
            id: Uuid::new_v4(),
            estimate_id,
            severity,
            status: AlertStatus::Active,
            utilization: decision.new_utilization,
            message: decision.message.clone(),
            acknowledged_by: None,
            resolution_notes: None,
            created_at: now,
        })
    }

    /// Marks the alert as seen.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAlertTransition` unless the alert is `Active`.
    pub fn acknowledge(&mut self, actor: &str) -> Result<(), BudgetError> {
        if self.status != AlertStatus::Active {
            return Err(BudgetError::InvalidAlertTransition {
                id: self.id,
                status: self.status.as_str().to_string(),
                action: "acknowledge".to_string(),
            });
        }
        self.status = AlertStatus::Acknowledged;
        self.acknowledged_by = Some(actor.to_string());
        Ok(())
    }

    /// Closes the alert with mandatory resolution notes.
    ///
    /// # Errors
    ///
    /// Returns `ReasonRequired` for blank notes and
    /// `InvalidAlertTransition` when already resolved.
    pub fn resolve(&mut self, notes: &str) -> Result<(), BudgetError> {
        if notes.trim().is_empty() {
            return Err(BudgetError::ReasonRequired);
        }
        if self.status == AlertStatus::Resolved {
            return Err(BudgetError::InvalidAlertTransition {
                id: self.id,
                status: self.status.as_str().to_string(),
                action: "resolve".to_string(),
            });
        }
        self.status = AlertStatus::Resolved;
        self.resolution_notes = Some(notes.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn decision(status: CheckStatus, requires_approval: bool) -> SpendingDecision {
        SpendingDecision {
            allowed: status != CheckStatus::Blocked,
            status,
            requires_approval,
            available: dec!(250000),
            new_utilization: dec!(0.85),
            message: "utilization 0.85".to_string(),
        }
    }

    #[test]
    fn test_warning_decision_raises_warning_alert() {
        let alert =
            BudgetAlert::from_decision(Uuid::nil(), &decision(CheckStatus::Warning, false), Utc::now())
                .unwrap();
        assert_eq!(alert.severity, AlertSeverity::Warning);
        assert_eq!(alert.status, AlertStatus::Active);
        assert_eq!(alert.utilization, dec!(0.85));
    }

    #[test]
    fn test_override_block_raises_critical_alert() {
        let alert =
            BudgetAlert::from_decision(Uuid::nil(), &decision(CheckStatus::Blocked, true), Utc::now())
                .unwrap();
        assert_eq!(alert.severity, AlertSeverity::Critical);
    }

    #[test]
    fn test_silent_and_plain_block_raise_nothing() {
        assert!(
            BudgetAlert::from_decision(Uuid::nil(), &decision(CheckStatus::None, false), Utc::now())
                .is_none()
        );
        assert!(BudgetAlert::from_decision(
            Uuid::nil(),
            &decision(CheckStatus::Blocked, false),
            Utc::now()
        )
        .is_none());
    }

    #[test]
    fn test_lifecycle_active_acknowledged_resolved() {
        let mut alert =
            BudgetAlert::from_decision(Uuid::nil(), &decision(CheckStatus::Warning, false), Utc::now())
                .unwrap();

        alert.acknowledge("chief1").unwrap();
        assert_eq!(alert.status, AlertStatus::Acknowledged);
        assert_eq!(alert.acknowledged_by.as_deref(), Some("chief1"));

        alert.resolve("spending plan revised for H2").unwrap();
        assert_eq!(alert.status, AlertStatus::Resolved);
    }

    #[test]
    fn test_acknowledge_twice_rejected() {
        let mut alert =
            BudgetAlert::from_decision(Uuid::nil(), &decision(CheckStatus::Warning, false), Utc::now())
                .unwrap();
        alert.acknowledge("a").unwrap();
        assert!(matches!(
            alert.acknowledge("b"),
            Err(BudgetError::InvalidAlertTransition { .. })
        ));
    }

    #[test]
    fn test_resolve_requires_notes() {
        let mut alert =
            BudgetAlert::from_decision(Uuid::nil(), &decision(CheckStatus::Warning, false), Utc::now())
                .unwrap();
        assert!(matches!(alert.resolve(" "), Err(BudgetError::ReasonRequired)));
    }

    #[test]
    fn test_resolve_directly_from_active() {
        let mut alert =
            BudgetAlert::from_decision(Uuid::nil(), &decision(CheckStatus::Warning, false), Utc::now())
                .unwrap();
        alert.resolve("duplicate of earlier alert").unwrap();
        assert_eq!(alert.status, AlertStatus::Resolved);
    }
}
