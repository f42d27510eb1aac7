//! Repository abstractions for data access.

pub mod audit;
pub mod budget;
pub mod period;
pub mod voucher;

pub use audit::{AuditFilter, AuditRepository};
pub use budget::BudgetRepository;
pub use period::PeriodRepository;
pub use voucher::{VoucherFilter, VoucherRepository, VoucherWithLines};
