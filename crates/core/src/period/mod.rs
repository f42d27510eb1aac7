//! Period lock rules.
//!
//! Two independent lock mechanisms guard posting:
//! - a single global "locked until" accounting date for the general ledger
//! - per fiscal-year/period lock flags for budget control

pub mod error;
pub mod lock;

pub use error::PeriodError;
pub use lock::{check_posting_allowed, validate_unlock_request};
