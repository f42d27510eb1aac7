//! `SeaORM` entity definitions.

pub mod anomalies;
pub mod audit_trail;
pub mod budget_alerts;
pub mod budget_authorizations;
pub mod budget_estimates;
pub mod budget_periods;
pub mod budget_transactions;
pub mod general_ledger_entries;
pub mod ledger_lock;
pub mod reconciliations;
pub mod voucher_lines;
pub mod vouchers;
