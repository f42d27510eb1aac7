//! Anomaly detection over budget data.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::audit::error::AuditError;
use crate::budget::types::{BudgetEstimate, BudgetTransaction, BudgetTransactionKind};

/// Kinds of detected anomalies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyKind {
    /// Committed plus spent exceeds the allocation.
    BudgetOverrun,
    /// A fund balance went negative.
    NegativeFundBalance,
    /// The same allocation appears more than once in a fiscal period.
    DuplicateAllocation,
}

impl AnomalyKind {
    /// Returns the string representation of the kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BudgetOverrun => "BUDGET_OVERRUN",
            Self::NegativeFundBalance => "NEGATIVE_FUND_BALANCE",
            Self::DuplicateAllocation => "DUPLICATE_ALLOCATION",
        }
    }

    /// Parse a kind from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "BUDGET_OVERRUN" => Some(Self::BudgetOverrun),
            "NEGATIVE_FUND_BALANCE" => Some(Self::NegativeFundBalance),
            "DUPLICATE_ALLOCATION" => Some(Self::DuplicateAllocation),
            _ => None,
        }
    }
}

/// Anomaly lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyStatus {
    /// Newly detected.
    Open,
    /// Seen by an operator.
    Acknowledged,
    /// Closed with resolution notes.
    Resolved,
}

impl AnomalyStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Acknowledged => "ACKNOWLEDGED",
            Self::Resolved => "RESOLVED",
        }
    }

    /// Parse a status from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "OPEN" => Some(Self::Open),
            "ACKNOWLEDGED" => Some(Self::Acknowledged),
            "RESOLVED" => Some(Self::Resolved),
            _ => None,
        }
    }
}

/// A raw detection result before persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnomalyFinding {
    /// Anomaly kind.
    pub kind: AnomalyKind,
    /// Key identifying the underlying root cause. Re-running detection
    /// over the same data yields the same key, which keeps the scan
    /// idempotent.
    pub root_cause_key: String,
    /// Human-readable description with the concrete values.
    pub description: String,
}

/// A persisted anomaly record.
#[derive(Debug, Clone)]
pub struct Anomaly {
    /// Anomaly id.
    pub id: Uuid,
    /// Fiscal year the scan covered.
    pub fiscal_year: i32,
    /// Anomaly kind.
    pub kind: AnomalyKind,
    /// Root-cause key (unique among OPEN anomalies).
    pub root_cause_key: String,
    /// Description.
    pub description: String,
    /// Lifecycle status.
    pub status: AnomalyStatus,
    /// Actor who acknowledged the anomaly.
    pub acknowledged_by: Option<String>,
    /// Resolution notes.
    pub resolution_notes: Option<String>,
    /// Detection timestamp.
    pub created_at: DateTime<Utc>,
}

impl Anomaly {
    /// Materializes a finding into a new OPEN anomaly.
    #[must_use]
    pub fn from_finding(finding: AnomalyFinding, fiscal_year: i32, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            fiscal_year,
            kind: finding.kind,
            root_cause_key: finding.root_cause_key,
            description: finding.description,
            status: AnomalyStatus::Open,
            acknowledged_by: None,
            resolution_notes: None,
            created_at: now,
        }
    }

    /// Marks the anomaly as seen.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the anomaly is `Open`.
    pub fn acknowledge(&mut self, actor: &str) -> Result<(), AuditError> {
        if self.status != AnomalyStatus::Open {
            return Err(AuditError::InvalidTransition {
                id: self.id,
                status: self.status.as_str().to_string(),
                action: "acknowledge".to_string(),
            });
        }
        self.status = AnomalyStatus::Acknowledged;
        self.acknowledged_by = Some(actor.to_string());
        Ok(())
    }

    /// Closes the anomaly with mandatory resolution notes.
    ///
    /// # Errors
    ///
    /// Returns `ReasonRequired` for blank notes and `InvalidTransition`
    /// when already resolved.
    pub fn resolve(&mut self, notes: &str) -> Result<(), AuditError> {
        if notes.trim().is_empty() {
            return Err(AuditError::ReasonRequired);
        }
        if self.status == AnomalyStatus::Resolved {
            return Err(AuditError::InvalidTransition {
                id: self.id,
                status: self.status.as_str().to_string(),
                action: "resolve".to_string(),
            });
        }
        self.status = AnomalyStatus::Resolved;
        self.resolution_notes = Some(notes.to_string());
        Ok(())
    }
}

/// Finds estimates whose committed plus spent total exceeds the
/// allocation.
#[must_use]
pub fn detect_budget_overruns(estimates: &[BudgetEstimate]) -> Vec<AnomalyFinding> {
    estimates
        .iter()
        .filter(|e| e.committed_amount + e.spent_amount > e.allocated_amount)
        .map(|e| AnomalyFinding {
            kind: AnomalyKind::BudgetOverrun,
            root_cause_key: format!("budget_overrun:{}", e.id),
            description: format!(
                "Estimate '{}' overrun: committed {} + spent {} exceeds allocation {}",
                e.code, e.committed_amount, e.spent_amount, e.allocated_amount
            ),
        })
        .collect()
}

/// Finds fund sources whose balance went negative.
#[must_use]
pub fn detect_negative_fund_balances(balances: &[(String, Decimal)]) -> Vec<AnomalyFinding> {
    balances
        .iter()
        .filter(|(_, balance)| *balance < Decimal::ZERO)
        .map(|(fund_code, balance)| AnomalyFinding {
            kind: AnomalyKind::NegativeFundBalance,
            root_cause_key: format!("negative_fund:{fund_code}"),
            description: format!("Fund '{fund_code}' balance is negative: {balance}"),
        })
        .collect()
}

/// Finds allocations of the same amount appended more than once to the
/// same estimate within one calendar month.
#[must_use]
pub fn detect_duplicate_allocations(transactions: &[BudgetTransaction]) -> Vec<AnomalyFinding> {
    let mut groups: HashMap<(Uuid, i32, u32, Decimal), usize> = HashMap::new();
    for tx in transactions
        .iter()
        .filter(|tx| tx.kind == BudgetTransactionKind::Allocation)
    {
        let key = (
            tx.estimate_id,
            tx.created_at.year(),
            tx.created_at.month(),
            tx.amount,
        );
        *groups.entry(key).or_insert(0) += 1;
    }

    let mut findings: Vec<AnomalyFinding> = groups
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|((estimate_id, year, month, amount), count)| AnomalyFinding {
            kind: AnomalyKind::DuplicateAllocation,
            root_cause_key: format!("dup_alloc:{estimate_id}:{year}-{month:02}:{amount}"),
            description: format!(
                "Allocation of {amount} to estimate {estimate_id} appears {count} times in {year}-{month:02}"
            ),
        })
        .collect();
    findings.sort_by(|a, b| a.root_cause_key.cmp(&b.root_cause_key));
    findings
}

/// Drops findings whose root cause already has an OPEN anomaly.
#[must_use]
pub fn filter_new_findings(
    findings: Vec<AnomalyFinding>,
    open_keys: &HashSet<String>,
) -> Vec<AnomalyFinding> {
    findings
        .into_iter()
        .filter(|f| !open_keys.contains(&f.root_cause_key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn estimate(code: &str, allocated: Decimal, committed: Decimal, spent: Decimal) -> BudgetEstimate {
        BudgetEstimate {
            id: Uuid::new_v4(),
            code: code.to_string(),
            name: code.to_string(),
            fiscal_year: 2025,
            allocated_amount: allocated,
            committed_amount: committed,
            spent_amount: spent,
        }
    }

    fn allocation(estimate_id: Uuid, amount: Decimal, created_at: DateTime<Utc>) -> BudgetTransaction {
        BudgetTransaction {
            id: Uuid::new_v4(),
            estimate_id,
            kind: BudgetTransactionKind::Allocation,
            amount,
            voucher_id: None,
            doc_no: None,
            description: String::new(),
            created_at,
        }
    }

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        chrono::NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
            .and_utc()
    }

    #[test]
    fn test_overrun_detected_only_past_allocation() {
        let findings = detect_budget_overruns(&[
            estimate("OK", dec!(1000), dec!(400), dec!(600)),
            estimate("OVER", dec!(1000), dec!(500), dec!(600)),
        ]);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].description.contains("OVER"));
        assert_eq!(findings[0].kind, AnomalyKind::BudgetOverrun);
    }

    #[test]
    fn test_negative_fund_balance_detected() {
        let findings = detect_negative_fund_balances(&[
            ("NS01".to_string(), dec!(500)),
            ("NS02".to_string(), dec!(-120.50)),
        ]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].root_cause_key, "negative_fund:NS02");
    }

    #[test]
    fn test_duplicate_allocation_same_month_detected() {
        let est = Uuid::new_v4();
        let findings = detect_duplicate_allocations(&[
            allocation(est, dec!(100000), ts(2025, 3, 1)),
            allocation(est, dec!(100000), ts(2025, 3, 20)),
            allocation(est, dec!(100000), ts(2025, 4, 1)),
            allocation(est, dec!(50000), ts(2025, 3, 5)),
        ]);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].root_cause_key.contains("2025-03"));
    }

    #[test]
    fn test_rerun_is_idempotent_via_open_keys() {
        let findings = detect_negative_fund_balances(&[("NS02".to_string(), dec!(-1))]);
        let open_keys: HashSet<String> =
            findings.iter().map(|f| f.root_cause_key.clone()).collect();

        let rerun = detect_negative_fund_balances(&[("NS02".to_string(), dec!(-1))]);
        assert!(filter_new_findings(rerun, &open_keys).is_empty());
    }

    #[test]
    fn test_resolved_anomaly_key_allows_new_detection() {
        let findings = detect_negative_fund_balances(&[("NS02".to_string(), dec!(-1))]);
        let mut anomaly = Anomaly::from_finding(findings[0].clone(), 2025, Utc::now());
        anomaly.resolve("fund replenished").unwrap();

        // Once resolved, the key no longer counts as open.
        let open_keys = HashSet::new();
        let rerun = detect_negative_fund_balances(&[("NS02".to_string(), dec!(-1))]);
        assert_eq!(filter_new_findings(rerun, &open_keys).len(), 1);
    }

    #[test]
    fn test_anomaly_lifecycle() {
        let finding = AnomalyFinding {
            kind: AnomalyKind::BudgetOverrun,
            root_cause_key: "budget_overrun:x".to_string(),
            description: "test".to_string(),
        };
        let mut anomaly = Anomaly::from_finding(finding, 2025, Utc::now());
        assert_eq!(anomaly.status, AnomalyStatus::Open);

        anomaly.acknowledge("chief1").unwrap();
        assert_eq!(anomaly.status, AnomalyStatus::Acknowledged);

        assert!(matches!(
            anomaly.resolve("  "),
            Err(AuditError::ReasonRequired)
        ));
        anomaly.resolve("allocation corrected by GL-099").unwrap();
        assert_eq!(anomaly.status, AnomalyStatus::Resolved);

        assert!(matches!(
            anomaly.acknowledge("x"),
            Err(AuditError::InvalidTransition { .. })
        ));
    }
}
