//! Chart-of-accounts operations.

use tracing::{info, instrument};

use contable_accounts::{Account, AccountKind};
use contable_core::{AccountId, DomainResult, Money, PeriodId, TenantId};

use crate::store::LedgerStore;

use super::dto::NewAccount;
use super::LedgerService;

impl<S: LedgerStore> LedgerService<S> {
    #[instrument(skip(self, account), fields(tenant = %tenant, code = %account.code))]
    pub fn create_account(&self, tenant: TenantId, account: NewAccount) -> DomainResult<Account> {
        let created = self.store().transaction(tenant, |state| {
            state
                .chart
                .create(
                    AccountId::new(),
                    &account.code,
                    account.name.clone(),
                    account.kind,
                    account.parent,
                )
                .cloned()
        })?;
        info!(account_id = %created.id, level = created.level, "account created");
        Ok(created)
    }

    pub fn get_account(&self, tenant: TenantId, account: AccountId) -> DomainResult<Account> {
        self.store()
            .read(tenant, |state| state.chart.get(account).cloned())
    }

    pub fn rename_account(
        &self,
        tenant: TenantId,
        account: AccountId,
        name: impl Into<String>,
    ) -> DomainResult<()> {
        let name = name.into();
        self.store()
            .transaction(tenant, |state| state.chart.rename(account, name))
    }

    /// Move an account (and its subtree) under a new parent.
    ///
    /// Aggregation paths change shape, so the whole tenant's cached
    /// balances are dropped after commit.
    #[instrument(skip(self), fields(tenant = %tenant))]
    pub fn reparent_account(
        &self,
        tenant: TenantId,
        account: AccountId,
        new_parent: Option<AccountId>,
    ) -> DomainResult<()> {
        self.store()
            .transaction(tenant, |state| state.chart.reparent(account, new_parent))?;
        self.balances().invalidate_tenant(tenant);
        Ok(())
    }

    pub fn change_account_kind(
        &self,
        tenant: TenantId,
        account: AccountId,
        kind: AccountKind,
    ) -> DomainResult<()> {
        self.store()
            .transaction(tenant, |state| state.chart.change_kind(account, kind))
    }

    #[instrument(skip(self), fields(tenant = %tenant))]
    pub fn delete_account(&self, tenant: TenantId, account: AccountId) -> DomainResult<()> {
        self.store().transaction(tenant, |state| {
            let has_movements = state.account_has_movements(account);
            state.chart.delete(account, has_movements).map(|_| ())
        })?;
        self.balances().invalidate(tenant, &[account]);
        Ok(())
    }

    /// Signed balance of an account, optionally restricted to one period.
    ///
    /// Cached per (tenant, account, period); the posting and voiding paths
    /// invalidate the affected chain explicitly.
    pub fn account_balance(
        &self,
        tenant: TenantId,
        account: AccountId,
        period: Option<PeriodId>,
    ) -> DomainResult<Money> {
        if let Some(balance) = self.balances().get(tenant, account, period) {
            return Ok(balance);
        }
        let balance = self.store().read(tenant, |state| {
            let period_ref = match period {
                Some(id) => Some(state.periods.get(id)?),
                None => None,
            };
            state
                .chart
                .balance(account, &|leaf| state.posted_leaf_balance(*leaf, period_ref))
        })?;
        self.balances().put(tenant, account, period, balance);
        Ok(balance)
    }

    /// Depth-first hierarchical report (preorder; indent by `level`).
    pub fn account_tree_report(
        &self,
        tenant: TenantId,
        root: Option<AccountId>,
    ) -> DomainResult<Vec<Account>> {
        self.store()
            .read(tenant, |state| Ok(state.chart.tree(root)?.cloned().collect()))
    }
}
