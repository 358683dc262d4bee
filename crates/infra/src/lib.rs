//! Infrastructure layer: stores, balance cache, and the service facade.

pub mod balance;
pub mod retry;
pub mod service;
pub mod store;

#[cfg(test)]
mod integration_tests;

pub use balance::BalanceCache;
pub use retry::with_retry;
pub use service::LedgerService;
pub use store::{InMemoryLedgerStore, LedgerStore, TenantState};
