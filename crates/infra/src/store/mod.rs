//! Persistence boundary: tenant-scoped state behind explicit transactions.
//!
//! Every mutating operation of the service runs inside exactly one
//! [`LedgerStore::transaction`] call: either the whole operation commits or
//! nothing does. Counter increments happen inside the same transaction as
//! the entity that consumes the number, so an aborted caller never burns a
//! number visibly and a committed one never reuses it.

use std::collections::HashMap;

use contable_accounts::ChartOfAccounts;
use contable_core::{
    AccountId, DomainError, DomainResult, EntryId, JournalId, Money, SeriesId, TenantId,
};
use contable_ledger::{EntryStatus, Journal, JournalEntry, SourceDocumentId};
use contable_numbering::DocumentSeries;
use contable_periods::{AccountingPeriod, PeriodCalendar};

pub mod archive;
pub mod memory;
pub mod postgres;

pub use archive::{EntryArchive, EntryFilter, EntryPage, Pagination};
pub use memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;

/// Everything the engine persists for one tenant.
#[derive(Debug, Clone, Default)]
pub struct TenantState {
    pub chart: ChartOfAccounts,
    pub journals: HashMap<JournalId, Journal>,
    pub entries: HashMap<EntryId, JournalEntry>,
    pub periods: PeriodCalendar,
    pub series: HashMap<SeriesId, DocumentSeries>,
}

impl TenantState {
    pub fn journal(&self, id: JournalId) -> DomainResult<&Journal> {
        self.journals.get(&id).ok_or_else(DomainError::not_found)
    }

    pub fn journal_mut(&mut self, id: JournalId) -> DomainResult<&mut Journal> {
        self.journals.get_mut(&id).ok_or_else(DomainError::not_found)
    }

    pub fn entry(&self, id: EntryId) -> DomainResult<&JournalEntry> {
        self.entries.get(&id).ok_or_else(DomainError::not_found)
    }

    pub fn entry_mut(&mut self, id: EntryId) -> DomainResult<&mut JournalEntry> {
        self.entries.get_mut(&id).ok_or_else(DomainError::not_found)
    }

    pub fn series(&self, id: SeriesId) -> DomainResult<&DocumentSeries> {
        self.series.get(&id).ok_or_else(DomainError::not_found)
    }

    pub fn series_mut(&mut self, id: SeriesId) -> DomainResult<&mut DocumentSeries> {
        self.series.get_mut(&id).ok_or_else(DomainError::not_found)
    }

    /// Any line of any entry (draft, posted or voided) referencing `account`.
    pub fn account_has_movements(&self, account: AccountId) -> bool {
        self.entries.values().any(|e| e.references_account(account))
    }

    /// Entry sits in `period` via its explicit link or, lacking one, its date.
    fn entry_in_period(entry: &JournalEntry, period: &AccountingPeriod) -> bool {
        match entry.period {
            Some(linked) => linked == period.id,
            None => period.contains(entry.date),
        }
    }

    /// Draft entries dated into `period` (the close gate).
    pub fn draft_count_in_period(&self, period: &AccountingPeriod) -> usize {
        self.entries
            .values()
            .filter(|e| e.status() == EntryStatus::Draft && Self::entry_in_period(e, period))
            .count()
    }

    /// Σdebit − Σcredit over the posted lines of one auxiliary account,
    /// optionally restricted to one period.
    pub fn posted_leaf_balance(
        &self,
        account: AccountId,
        period: Option<&AccountingPeriod>,
    ) -> Money {
        let mut total = 0i64;
        for entry in self.entries.values() {
            if entry.status() != EntryStatus::Posted {
                continue;
            }
            if let Some(period) = period {
                if !Self::entry_in_period(entry, period) {
                    continue;
                }
            }
            for line in entry.lines() {
                if line.account == account {
                    total += line.signed_amount().cents();
                }
            }
        }
        Money::from_cents(total)
    }

    pub fn journal_owns_posted_entries(&self, journal: JournalId) -> bool {
        self.entries
            .values()
            .any(|e| e.journal == journal && e.status() != EntryStatus::Draft)
    }

    /// Whether a source document already owns an entry (voided ones do not
    /// count; voiding releases the document for regeneration).
    pub fn source_document_linked(&self, document: SourceDocumentId) -> bool {
        self.entries
            .values()
            .any(|e| e.source_document == Some(document) && e.status() != EntryStatus::Voided)
    }
}

/// Tenant-scoped store with explicit transactions.
///
/// Implementations must guarantee:
/// - transactions are atomic per tenant: the mutation closure either commits
///   wholly or leaves no trace;
/// - writers of the same tenant are serialized (callers may block briefly);
/// - tenants never block each other.
pub trait LedgerStore: Send + Sync {
    /// Run a read-only closure against the tenant's state.
    fn read<R>(
        &self,
        tenant: TenantId,
        f: impl FnOnce(&TenantState) -> DomainResult<R>,
    ) -> DomainResult<R>;

    /// Run a mutating closure inside one atomic transaction.
    fn transaction<R>(
        &self,
        tenant: TenantId,
        f: impl FnOnce(&mut TenantState) -> DomainResult<R>,
    ) -> DomainResult<R>;
}
