//! Accounting periods: month/year windows gating what the ledger may post.
//!
//! Pure domain logic only: no IO, no persistence concerns.

pub mod calendar;
pub mod period;

pub use calendar::{BulkCreateReport, PeriodCalendar};
pub use period::{AccountingPeriod, PeriodStatus};
