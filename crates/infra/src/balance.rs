//! Cached account balances with explicit invalidation.
//!
//! Balances are pure derived values; the cache only memoizes them. The
//! posting path invalidates the written accounts and every ancestor up to
//! the root as an explicit, testable call — there is no observer wiring.
//! Readers tolerate a brief staleness window but never see a committed line
//! double-counted or dropped once invalidation has run.

use std::collections::HashMap;
use std::sync::RwLock;

use contable_core::{AccountId, Money, PeriodId, TenantId};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
struct BalanceKey {
    tenant: TenantId,
    account: AccountId,
    period: Option<PeriodId>,
}

/// Tenant-scoped memo of computed balances.
#[derive(Debug, Default)]
pub struct BalanceCache {
    cached: RwLock<HashMap<BalanceKey, Money>>,
}

impl BalanceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        tenant: TenantId,
        account: AccountId,
        period: Option<PeriodId>,
    ) -> Option<Money> {
        let cached = self.cached.read().ok()?;
        cached.get(&BalanceKey { tenant, account, period }).copied()
    }

    pub fn put(
        &self,
        tenant: TenantId,
        account: AccountId,
        period: Option<PeriodId>,
        balance: Money,
    ) {
        if let Ok(mut cached) = self.cached.write() {
            cached.insert(BalanceKey { tenant, account, period }, balance);
        }
    }

    /// Drop every cached balance (all period variants) of the given accounts.
    ///
    /// The caller passes each written account together with its ancestor
    /// chain; aggregates above a written leaf go stale with it.
    pub fn invalidate(&self, tenant: TenantId, accounts: &[AccountId]) {
        if let Ok(mut cached) = self.cached.write() {
            cached.retain(|key, _| key.tenant != tenant || !accounts.contains(&key.account));
        }
    }

    /// Drop everything cached for a tenant (hierarchy reshapes).
    pub fn invalidate_tenant(&self, tenant: TenantId) {
        if let Ok(mut cached) = self.cached.write() {
            cached.retain(|key, _| key.tenant != tenant);
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.cached.read().map(|c| c.len()).unwrap_or(0)
    }
}
