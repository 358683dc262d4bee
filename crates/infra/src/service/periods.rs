//! Accounting-period operations.

use chrono::Utc;
use tracing::{info, instrument};

use contable_core::{DomainResult, PeriodId, TenantId, UserId};
use contable_periods::{AccountingPeriod, BulkCreateReport};

use crate::store::LedgerStore;

use super::LedgerService;

impl<S: LedgerStore> LedgerService<S> {
    pub fn create_period(
        &self,
        tenant: TenantId,
        month: u8,
        year: i32,
    ) -> DomainResult<AccountingPeriod> {
        self.store().transaction(tenant, |state| {
            state.periods.create(PeriodId::new(), month, year).cloned()
        })
    }

    /// Create the missing periods of `year`, reporting skipped months.
    /// Existing periods are never overwritten, whatever their state.
    pub fn bulk_create_periods(
        &self,
        tenant: TenantId,
        year: i32,
        months: &[u8],
    ) -> DomainResult<BulkCreateReport> {
        let report = self.store().transaction(tenant, |state| {
            state.periods.bulk_create(year, months, PeriodId::new)
        })?;
        info!(
            tenant = %tenant,
            created = report.created.len(),
            skipped = report.skipped_months.len(),
            "periods created"
        );
        Ok(report)
    }

    pub fn get_period(&self, tenant: TenantId, period: PeriodId) -> DomainResult<AccountingPeriod> {
        self.store().read(tenant, |state| state.periods.get(period).cloned())
    }

    /// Close a period. Fails while any draft entry is dated into it.
    #[instrument(skip(self), fields(tenant = %tenant))]
    pub fn close_period(
        &self,
        tenant: TenantId,
        period: PeriodId,
        closed_by: UserId,
    ) -> DomainResult<AccountingPeriod> {
        let closed = self.store().transaction(tenant, |state| {
            let snapshot = state.periods.get(period)?.clone();
            let drafts = state.draft_count_in_period(&snapshot);
            state.periods.close(period, drafts, closed_by, Utc::now())?;
            state.periods.get(period).cloned()
        })?;
        info!(month = closed.month, year = closed.year, "period closed");
        Ok(closed)
    }

    /// Reopen a period; a closed later period blocks it.
    #[instrument(skip(self), fields(tenant = %tenant))]
    pub fn reopen_period(
        &self,
        tenant: TenantId,
        period: PeriodId,
    ) -> DomainResult<AccountingPeriod> {
        let reopened = self.store().transaction(tenant, |state| {
            state.periods.reopen(period)?;
            state.periods.get(period).cloned()
        })?;
        info!(month = reopened.month, year = reopened.year, "period reopened");
        Ok(reopened)
    }

    /// The period containing today, if one is configured.
    pub fn current_period(&self, tenant: TenantId) -> DomainResult<Option<AccountingPeriod>> {
        let today = Utc::now().date_naive();
        self.store()
            .read(tenant, |state| Ok(state.periods.current(today).cloned()))
    }
}
