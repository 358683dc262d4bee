//! Journal-entry operations: drafting, posting, voiding, deriving.

use chrono::Utc;
use tracing::{info, instrument};

use contable_core::{
    AccountId, DomainError, DomainResult, EntryId, LineId, Money, TenantId,
};
use contable_ledger::{entry_from_source_document, EntryStatus, JournalEntry};

use crate::retry::{with_retry, DEFAULT_ATTEMPTS};
use crate::store::{LedgerStore, TenantState};

use super::dto::{NewEntry, NewLine, SourceDocumentEntry};
use super::LedgerService;

impl<S: LedgerStore> LedgerService<S> {
    /// Create a draft entry with its initial lines (at least two).
    #[instrument(skip(self, entry), fields(tenant = %tenant, journal = %entry.journal))]
    pub fn create_entry(&self, tenant: TenantId, entry: NewEntry) -> DomainResult<JournalEntry> {
        let created = self.store().transaction(tenant, |state| {
            state.journal(entry.journal)?;
            if let Some(period) = entry.period {
                state.periods.get(period)?;
            }
            if entry.lines.len() < 2 {
                return Err(DomainError::validation(
                    "entry needs at least two lines",
                ));
            }
            let mut draft =
                JournalEntry::new(EntryId::new(), entry.journal, entry.date, entry.memo.clone());
            draft.period = entry.period;
            for line in &entry.lines {
                let account = state.chart.get(line.account)?.clone();
                draft.add_line(
                    LineId::new(),
                    &account,
                    line.description.clone(),
                    line.debit,
                    line.credit,
                )?;
            }
            let id = draft.id;
            state.entries.insert(id, draft);
            state.entry(id).cloned()
        })?;
        info!(entry_id = %created.id, lines = created.lines().len(), "draft entry created");
        Ok(created)
    }

    pub fn get_entry(&self, tenant: TenantId, entry: EntryId) -> DomainResult<JournalEntry> {
        self.store().read(tenant, |state| state.entry(entry).cloned())
    }

    pub fn add_line(
        &self,
        tenant: TenantId,
        entry: EntryId,
        line: NewLine,
    ) -> DomainResult<JournalEntry> {
        self.store().transaction(tenant, |state| {
            let account = state.chart.get(line.account)?.clone();
            let target = state.entry_mut(entry)?;
            target.add_line(
                LineId::new(),
                &account,
                line.description.clone(),
                line.debit,
                line.credit,
            )?;
            state.entry(entry).cloned()
        })
    }

    pub fn update_line(
        &self,
        tenant: TenantId,
        entry: EntryId,
        line: LineId,
        debit: Money,
        credit: Money,
        description: Option<String>,
    ) -> DomainResult<JournalEntry> {
        self.store().transaction(tenant, |state| {
            state
                .entry_mut(entry)?
                .update_line(line, debit, credit, description)?;
            state.entry(entry).cloned()
        })
    }

    pub fn remove_line(
        &self,
        tenant: TenantId,
        entry: EntryId,
        line: LineId,
    ) -> DomainResult<JournalEntry> {
        self.store().transaction(tenant, |state| {
            state.entry_mut(entry)?.remove_line(line)?;
            state.entry(entry).cloned()
        })
    }

    /// Recompute an entry's totals from its lines. Idempotent.
    pub fn recalculate_totals(
        &self,
        tenant: TenantId,
        entry: EntryId,
    ) -> DomainResult<(Money, Money)> {
        self.store().transaction(tenant, |state| {
            let target = state.entry_mut(entry)?;
            target.recalculate_totals()?;
            Ok((target.total_debit(), target.total_haber()))
        })
    }

    /// Post an entry: draw its number from the journal's correlative, gate
    /// on the accounting period, freeze the lines.
    ///
    /// The correlative is touched before the entry inside the same
    /// transaction (counter before entry, always); an abort rolls both
    /// back, so no number is burned and none is ever reused. Conflicts on
    /// the counter are retried transparently a bounded number of times.
    #[instrument(skip(self), fields(tenant = %tenant, entry = %entry))]
    pub fn post_entry(&self, tenant: TenantId, entry: EntryId) -> DomainResult<JournalEntry> {
        let (posted, touched) = with_retry(DEFAULT_ATTEMPTS, || {
            self.store().transaction(tenant, |state| {
                let (journal_id, date, linked_period) = {
                    let target = state.entry(entry)?;
                    (target.journal, target.date, target.period)
                };
                let period = match linked_period {
                    Some(id) => Some(state.periods.get(id)?.clone()),
                    None => state.periods.period_for_date(date).cloned(),
                };

                // Counter first, then the entry row.
                let (_, number) = state.journal_mut(journal_id)?.next_number();

                let target = state.entry_mut(entry)?;
                if target.period.is_none() {
                    target.period = period.as_ref().map(|p| p.id);
                }
                target.post(number, period.as_ref(), Utc::now())?;

                let posted = state.entry(entry)?.clone();
                let touched = touched_accounts(state, &posted)?;
                Ok((posted, touched))
            })
        })?;

        // Explicit invalidation, after commit: the posted lines changed the
        // balance of their accounts and of every ancestor up to the root.
        self.balances().invalidate(tenant, &touched);
        info!(number = posted.number().unwrap_or(""), "entry posted");
        Ok(posted)
    }

    /// Void an entry (from draft or posted). Rows are kept for audit.
    #[instrument(skip(self), fields(tenant = %tenant, entry = %entry))]
    pub fn void_entry(&self, tenant: TenantId, entry: EntryId) -> DomainResult<JournalEntry> {
        let (voided, touched) = self.store().transaction(tenant, |state| {
            let was_posted = state.entry(entry)?.status() == EntryStatus::Posted;
            state.entry_mut(entry)?.void(Utc::now())?;
            let voided = state.entry(entry)?.clone();
            let touched = if was_posted {
                touched_accounts(state, &voided)?
            } else {
                Vec::new()
            };
            Ok((voided, touched))
        })?;
        if !touched.is_empty() {
            self.balances().invalidate(tenant, &touched);
        }
        info!("entry voided");
        Ok(voided)
    }

    /// A fresh draft with the same lines, no number, totals recomputed.
    pub fn duplicate_entry(&self, tenant: TenantId, entry: EntryId) -> DomainResult<JournalEntry> {
        self.store().transaction(tenant, |state| {
            let copy = state.entry(entry)?.duplicate(EntryId::new(), LineId::new)?;
            let id = copy.id;
            state.entries.insert(id, copy);
            state.entry(id).cloned()
        })
    }

    /// Derive a balanced draft from an external document's totals.
    #[instrument(skip(self, request), fields(tenant = %tenant, document = %request.totals.document))]
    pub fn entry_from_source(
        &self,
        tenant: TenantId,
        request: SourceDocumentEntry,
    ) -> DomainResult<JournalEntry> {
        self.store().transaction(tenant, |state| {
            if state.source_document_linked(request.totals.document) {
                return Err(DomainError::AlreadyLinked);
            }
            state.journal(request.journal)?;
            let receivable = state.chart.get(request.receivable_account)?.clone();
            let revenue = state.chart.get(request.revenue_account)?.clone();
            let tax = state.chart.get(request.tax_account)?.clone();
            let entry = entry_from_source_document(
                EntryId::new(),
                request.journal,
                request.date,
                request.memo.clone(),
                &request.totals,
                &receivable,
                &revenue,
                &tax,
                LineId::new,
            )?;
            let id = entry.id;
            state.entries.insert(id, entry);
            state.entry(id).cloned()
        })
    }

    /// Entries of a tenant, optionally filtered, ordered by (date, id).
    pub fn list_entries(
        &self,
        tenant: TenantId,
        journal: Option<contable_core::JournalId>,
        status: Option<EntryStatus>,
    ) -> DomainResult<Vec<JournalEntry>> {
        self.store().read(tenant, |state| {
            let mut entries: Vec<JournalEntry> = state
                .entries
                .values()
                .filter(|e| journal.map_or(true, |j| e.journal == j))
                .filter(|e| status.map_or(true, |s| e.status() == s))
                .cloned()
                .collect();
            entries.sort_by_key(|e| (e.date, e.id));
            Ok(entries)
        })
    }
}

/// The accounts whose cached balances an entry write dirties: every line's
/// account plus all of its ancestors.
fn touched_accounts(state: &TenantState, entry: &JournalEntry) -> DomainResult<Vec<AccountId>> {
    let mut touched = Vec::new();
    for line in entry.lines() {
        for id in state.chart.self_and_ancestors(line.account)? {
            if !touched.contains(&id) {
                touched.push(id);
            }
        }
    }
    Ok(touched)
}
