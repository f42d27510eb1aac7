//! Audit trail domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::audit::diff::changed_fields;
use crate::audit::fingerprint::compute_fingerprint;

/// Audited action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Entity created.
    Create,
    /// Entity updated.
    Update,
    /// Entity deleted.
    Delete,
    /// Audit record integrity verified.
    Verify,
    /// Ledger lock date moved.
    SetLock,
    /// Budget period unlocked.
    UnlockPeriod,
}

impl AuditAction {
    /// Parse an action from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "CREATE" => Some(Self::Create),
            "UPDATE" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            "VERIFY" => Some(Self::Verify),
            "SET_LOCK" => Some(Self::SetLock),
            "UNLOCK_PERIOD" => Some(Self::UnlockPeriod),
            _ => None,
        }
    }

    /// Returns the string representation of the action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Verify => "VERIFY",
            Self::SetLock => "SET_LOCK",
            Self::UnlockPeriod => "UNLOCK_PERIOD",
        }
    }
}

/// The fingerprinted content of an audit record: everything except the
/// id and the fingerprint itself.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRecordContent {
    /// Kind of entity audited (e.g. "voucher", "budget_period").
    pub entity_type: String,
    /// Id of the audited entity.
    pub entity_id: String,
    /// Action performed.
    pub action: AuditAction,
    /// Actor who performed it.
    pub actor: String,
    /// Reason given by the actor, if any.
    pub reason: Option<String>,
    /// Entity snapshot before the action (absent for CREATE).
    pub before: Option<Value>,
    /// Entity snapshot after the action (absent for DELETE).
    pub after: Option<Value>,
    /// Names of the fields the action changed.
    pub changed_fields: Vec<String>,
    /// Action timestamp.
    pub occurred_at: DateTime<Utc>,
}

/// A sealed audit record: content plus its SHA-256 fingerprint.
///
/// Records are append-only; no update or delete path exists anywhere in
/// the system.
#[derive(Debug, Clone, Serialize)]
pub struct AuditTrailRecord {
    /// Record id.
    pub id: Uuid,
    /// Fingerprinted content.
    #[serde(flatten)]
    pub content: AuditRecordContent,
    /// Hex-encoded SHA-256 over the canonical content.
    pub fingerprint: String,
}

impl AuditTrailRecord {
    /// Seals a content into a record, computing the fingerprint and the
    /// changed-field list.
    ///
    /// For UPDATE actions with both snapshots present the changed fields
    /// are derived from the snapshots; any caller-supplied list is
    /// replaced.
    #[must_use]
    pub fn seal(mut content: AuditRecordContent) -> Self {
        if content.action == AuditAction::Update {
            if let (Some(before), Some(after)) = (&content.before, &content.after) {
                content.changed_fields = changed_fields(before, after);
            }
        }
        let fingerprint = compute_fingerprint(&content);
        Self {
            id: Uuid::new_v4(),
            content,
            fingerprint,
        }
    }

    /// Recomputes the fingerprint and compares it with the stored one.
    #[must_use]
    pub fn verify(&self) -> VerificationOutcome {
        if compute_fingerprint(&self.content) == self.fingerprint {
            VerificationOutcome::Verified
        } else {
            VerificationOutcome::Mismatch
        }
    }
}

/// Outcome of an integrity verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationOutcome {
    /// The stored fingerprint matches the content.
    Verified,
    /// The stored fingerprint differs from the content.
    Mismatch,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn content(action: AuditAction) -> AuditRecordContent {
        AuditRecordContent {
            entity_type: "voucher".to_string(),
            entity_id: "a4f2".to_string(),
            action,
            actor: "accountant1".to_string(),
            reason: None,
            before: Some(json!({"doc_no": "GL-001", "amount": "100"})),
            after: Some(json!({"doc_no": "GL-001", "amount": "250"})),
            changed_fields: vec![],
            occurred_at: Utc::now(),
        }
    }

    #[test]
    fn test_seal_derives_changed_fields_for_update() {
        let record = AuditTrailRecord::seal(content(AuditAction::Update));
        assert_eq!(record.content.changed_fields, vec!["amount".to_string()]);
        assert!(!record.fingerprint.is_empty());
    }

    #[test]
    fn test_sealed_record_verifies() {
        let record = AuditTrailRecord::seal(content(AuditAction::Update));
        assert_eq!(record.verify(), VerificationOutcome::Verified);
    }

    #[test]
    fn test_tampered_record_fails_verification() {
        let mut record = AuditTrailRecord::seal(content(AuditAction::Update));
        record.content.actor = "intruder".to_string();
        assert_eq!(record.verify(), VerificationOutcome::Mismatch);
    }

    #[test]
    fn test_create_keeps_caller_changed_fields() {
        let mut c = content(AuditAction::Create);
        c.before = None;
        let record = AuditTrailRecord::seal(c);
        assert!(record.content.changed_fields.is_empty());
        assert_eq!(record.verify(), VerificationOutcome::Verified);
    }

    #[test]
    fn test_action_roundtrip() {
        for action in [
            AuditAction::Create,
            AuditAction::Update,
            AuditAction::Delete,
            AuditAction::Verify,
            AuditAction::SetLock,
            AuditAction::UnlockPeriod,
        ] {
            assert_eq!(AuditAction::parse(action.as_str()), Some(action));
        }
    }
}
