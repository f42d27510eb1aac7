//! Core business logic for the Socai ledger posting and budget control engine.
//!
//! This crate contains pure domain logic with no web or database
//! dependencies:
//! - `posting`: voucher validation, balance rules, and general ledger expansion
//! - `budget`: budget availability, spending checks, authorizations, alerts
//! - `audit`: append-only audit records, diffs, fingerprints, anomaly detection
//! - `period`: accounting date locks and budget period lock rules
//! - `actor`: actor roles used by lock and approval rules

pub mod actor;
pub mod audit;
pub mod budget;
pub mod period;
pub mod posting;
