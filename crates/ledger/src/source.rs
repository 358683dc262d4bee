//! Deriving entries from external source documents (invoices).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use contable_accounts::Account;
use contable_core::{DomainError, DomainResult, EntryId, JournalId, LineId, Money};

use crate::entry::JournalEntry;

/// Identifier of an external source document (e.g. an invoice). Opaque to
/// the ledger; the invoicing subsystem owns its meaning.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceDocumentId(Uuid);

impl SourceDocumentId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SourceDocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for SourceDocumentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// What the invoicing subsystem supplies: totals plus the accounts the
/// amounts map onto. The ledger does not know how the totals were computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocumentTotals {
    pub document: SourceDocumentId,
    pub total_net: Money,
    pub total_tax: Money,
    pub total_gross: Money,
}

/// Build a balanced draft entry from a source document's totals.
///
/// Gross is debited to the receivable account; net and tax are credited to
/// the revenue and tax accounts (the tax line is omitted when the tax is
/// zero). The one-entry-per-document rule (`AlreadyLinked`) is enforced by
/// the service, which can see all entries of the tenant.
pub fn entry_from_source_document(
    entry_id: EntryId,
    journal: JournalId,
    date: NaiveDate,
    memo: impl Into<String>,
    doc: &SourceDocumentTotals,
    receivable: &Account,
    revenue: &Account,
    tax: &Account,
    mut make_line_id: impl FnMut() -> LineId,
) -> DomainResult<JournalEntry> {
    if !doc.total_gross.is_positive() || !doc.total_net.is_positive() {
        return Err(DomainError::validation(
            "source document totals must be positive",
        ));
    }
    if doc.total_tax < Money::ZERO {
        return Err(DomainError::validation(
            "source document tax must not be negative",
        ));
    }
    let expected = doc.total_net.checked_add(doc.total_tax)?;
    if expected != doc.total_gross {
        return Err(DomainError::Unbalanced {
            debit: doc.total_gross,
            haber: expected,
        });
    }

    let mut entry = JournalEntry::new(entry_id, journal, date, memo);
    entry.add_line(
        make_line_id(),
        receivable,
        "receivable",
        doc.total_gross,
        Money::ZERO,
    )?;
    entry.add_line(make_line_id(), revenue, "revenue", Money::ZERO, doc.total_net)?;
    if doc.total_tax.is_positive() {
        entry.add_line(make_line_id(), tax, "tax payable", Money::ZERO, doc.total_tax)?;
    }
    entry.link_source_document(doc.document);
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contable_accounts::{AccountKind, ChartOfAccounts};
    use contable_core::AccountId;

    fn leaf(chart: &mut ChartOfAccounts, root_code: &str, kind: AccountKind) -> AccountId {
        let mut parent = None;
        let mut code = String::new();
        let mut id = AccountId::new();
        for _ in 0..4 {
            id = AccountId::new();
            code = format!("{code}{root_code}");
            chart.create(id, &code, "n", kind, parent).unwrap();
            parent = Some(id);
        }
        id
    }

    fn mapping() -> (ChartOfAccounts, AccountId, AccountId, AccountId) {
        let mut chart = ChartOfAccounts::new();
        let receivable = leaf(&mut chart, "1", AccountKind::Asset);
        let revenue = leaf(&mut chart, "7", AccountKind::Income);
        let tax = leaf(&mut chart, "4", AccountKind::Liability);
        (chart, receivable, revenue, tax)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 5, 20).unwrap()
    }

    #[test]
    fn generated_entry_is_balanced_and_linked() {
        let (chart, receivable, revenue, tax) = mapping();
        let doc = SourceDocumentTotals {
            document: SourceDocumentId::new(),
            total_net: Money::from_cents(10_000),
            total_tax: Money::from_cents(1_800),
            total_gross: Money::from_cents(11_800),
        };
        let entry = entry_from_source_document(
            EntryId::new(),
            JournalId::new(),
            date(),
            "Invoice F001-00000001",
            &doc,
            chart.get(receivable).unwrap(),
            chart.get(revenue).unwrap(),
            chart.get(tax).unwrap(),
            LineId::new,
        )
        .unwrap();

        assert!(entry.is_balanced());
        assert_eq!(entry.lines().len(), 3);
        assert_eq!(entry.total_debit(), Money::from_cents(11_800));
        assert_eq!(entry.source_document, Some(doc.document));
        assert!(entry.is_draft());
    }

    #[test]
    fn tax_free_documents_produce_two_lines() {
        let (chart, receivable, revenue, tax) = mapping();
        let doc = SourceDocumentTotals {
            document: SourceDocumentId::new(),
            total_net: Money::from_cents(5_000),
            total_tax: Money::ZERO,
            total_gross: Money::from_cents(5_000),
        };
        let entry = entry_from_source_document(
            EntryId::new(),
            JournalId::new(),
            date(),
            "Exempt invoice",
            &doc,
            chart.get(receivable).unwrap(),
            chart.get(revenue).unwrap(),
            chart.get(tax).unwrap(),
            LineId::new,
        )
        .unwrap();
        assert_eq!(entry.lines().len(), 2);
        assert!(entry.is_balanced());
    }

    #[test]
    fn inconsistent_totals_are_rejected() {
        let (chart, receivable, revenue, tax) = mapping();
        let doc = SourceDocumentTotals {
            document: SourceDocumentId::new(),
            total_net: Money::from_cents(10_000),
            total_tax: Money::from_cents(1_800),
            total_gross: Money::from_cents(12_000),
        };
        let err = entry_from_source_document(
            EntryId::new(),
            JournalId::new(),
            date(),
            "Bad invoice",
            &doc,
            chart.get(receivable).unwrap(),
            chart.get(revenue).unwrap(),
            chart.get(tax).unwrap(),
            LineId::new,
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::Unbalanced { .. }));
    }
}
