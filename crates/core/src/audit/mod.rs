//! Audit trail service.
//!
//! Append-only audit records with content fingerprints, field-level
//! diffs for updates, anomaly detection over budget data and the
//! reconciliation workflow.

pub mod anomaly;
pub mod diff;
pub mod error;
pub mod fingerprint;
pub mod reconciliation;
pub mod types;

pub use anomaly::{
    detect_budget_overruns, detect_duplicate_allocations, detect_negative_fund_balances,
    filter_new_findings, Anomaly, AnomalyFinding, AnomalyKind, AnomalyStatus,
};
pub use diff::changed_fields;
pub use error::AuditError;
pub use fingerprint::{canonical_json, compute_fingerprint};
pub use reconciliation::{
    Adjustment, OutstandingItem, ReconciliationRecord, ReconciliationStatus,
};
pub use types::{AuditAction, AuditRecordContent, AuditTrailRecord, VerificationOutcome};
