//! Ledger posting engine.
//!
//! This module implements the core voucher posting logic:
//! - Voucher and voucher line domain types
//! - Line validation and the debit/credit balance rule
//! - Off-balance-sheet handling (single-entry memo postings)
//! - Double-entry expansion into general ledger rows
//! - Error types for posting operations

pub mod error;
pub mod expansion;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod validation_props;

pub use error::PostingError;
pub use expansion::{expand_lines, EntrySide, GeneralLedgerEntry};
pub use service::{PostingService, ValidatedPosting};
pub use types::{
    LineTags, PostingMode, PostingTotals, VoucherHeaderInput, VoucherLineInput, VoucherStatus,
    VoucherType,
};
pub use validation::{is_off_balance_sheet, validate_lines, BALANCE_TOLERANCE};
