//! Chart of accounts: hierarchical account classification.
//!
//! Pure domain logic only: no IO, no persistence concerns. Balance *caching*
//! lives in the infra crate; this crate computes balances from a caller-
//! supplied leaf lookup.

pub mod account;
pub mod chart;
pub mod tree;

pub use account::{Account, AccountCode, AccountKind, AUXILIARY_LEVEL, MAX_LEVEL};
pub use chart::ChartOfAccounts;
pub use tree::TreeIter;
