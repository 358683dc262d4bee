//! Journal and document-series numbering operations.

use tracing::{info, instrument};

use contable_core::{DomainError, DomainResult, JournalId, SeriesId, TenantId};
use contable_ledger::Journal;
use contable_numbering::DocumentSeries;

use crate::retry::{with_retry, DEFAULT_ATTEMPTS};
use crate::store::LedgerStore;

use super::dto::{NewJournal, NewSeries};
use super::LedgerService;

impl<S: LedgerStore> LedgerService<S> {
    #[instrument(skip(self, journal), fields(tenant = %tenant, code = %journal.code))]
    pub fn create_journal(&self, tenant: TenantId, journal: NewJournal) -> DomainResult<Journal> {
        let created = self.store().transaction(tenant, |state| {
            if state.journals.values().any(|j| j.code == journal.code) {
                return Err(DomainError::conflict(format!(
                    "journal code {} already exists",
                    journal.code
                )));
            }
            let created = Journal::new(
                JournalId::new(),
                journal.code.clone(),
                journal.name.clone(),
                journal.kind,
                &journal.prefix,
            )?;
            let id = created.id;
            state.journals.insert(id, created);
            state.journal(id).cloned()
        })?;
        info!(journal_id = %created.id, "journal created");
        Ok(created)
    }

    pub fn get_journal(&self, tenant: TenantId, journal: JournalId) -> DomainResult<Journal> {
        self.store().read(tenant, |state| state.journal(journal).cloned())
    }

    /// Remove a journal. Refused while any entry still references it.
    pub fn delete_journal(&self, tenant: TenantId, journal: JournalId) -> DomainResult<()> {
        self.store().transaction(tenant, |state| {
            state.journal(journal)?;
            if state.journal_owns_posted_entries(journal) {
                return Err(DomainError::invalid_state(
                    "journal owns posted entries and cannot be deleted",
                ));
            }
            if state.entries.values().any(|e| e.journal == journal) {
                return Err(DomainError::conflict(
                    "journal still has draft entries",
                ));
            }
            state.journals.remove(&journal);
            Ok(())
        })
    }

    /// Move a journal's correlative. Below the issued maximum is rejected.
    pub fn reset_journal_correlative(
        &self,
        tenant: TenantId,
        journal: JournalId,
        new_value: u64,
    ) -> DomainResult<()> {
        self.store().transaction(tenant, |state| {
            state.journal_mut(journal)?.reset_correlative(new_value)
        })
    }

    #[instrument(skip(self, series), fields(tenant = %tenant, code = %series.code))]
    pub fn create_series(&self, tenant: TenantId, series: NewSeries) -> DomainResult<DocumentSeries> {
        let created = self.store().transaction(tenant, |state| {
            if state.series.values().any(|s| s.code.as_str() == series.code) {
                return Err(DomainError::conflict(format!(
                    "series {} already exists",
                    series.code
                )));
            }
            let created = DocumentSeries::new(SeriesId::new(), series.kind, &series.code)?;
            let id = created.id;
            state.series.insert(id, created);
            state.series(id).cloned()
        })?;
        info!(series_id = %created.id, "document series created");
        Ok(created)
    }

    pub fn get_series(&self, tenant: TenantId, series: SeriesId) -> DomainResult<DocumentSeries> {
        self.store().read(tenant, |state| state.series(series).cloned())
    }

    /// Draw the next document number from a series.
    ///
    /// Runs inside one transaction: commit order decides who gets the lower
    /// number, an abort returns the number invisibly, and two committed
    /// callers always end up numerically distinct. Counter conflicts are
    /// retried transparently.
    #[instrument(skip(self), fields(tenant = %tenant))]
    pub fn next_document_number(
        &self,
        tenant: TenantId,
        series: SeriesId,
    ) -> DomainResult<(u64, String)> {
        let issued = with_retry(DEFAULT_ATTEMPTS, || {
            self.store()
                .transaction(tenant, |state| state.series_mut(series)?.next_number())
        })?;
        info!(number = %issued.1, "document number issued");
        Ok(issued)
    }

    /// Render a number in a series' format without consuming anything.
    pub fn format_document_number(
        &self,
        tenant: TenantId,
        series: SeriesId,
        value: u64,
    ) -> DomainResult<String> {
        self.store()
            .read(tenant, |state| state.series(series)?.format(value))
    }

    /// Move a series' correlative. Below the issued maximum is rejected.
    pub fn reset_series(
        &self,
        tenant: TenantId,
        series: SeriesId,
        new_value: u64,
    ) -> DomainResult<()> {
        self.store()
            .transaction(tenant, |state| state.series_mut(series)?.reset(new_value))
    }
}
