//! Request payloads for the service facade.
//!
//! Domain entities themselves serialize cleanly, so responses reuse them;
//! only the inbound shapes live here.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use contable_accounts::AccountKind;
use contable_core::{AccountId, JournalId, Money, PeriodId};
use contable_ledger::{JournalKind, SourceDocumentTotals};
use contable_numbering::DocumentKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAccount {
    pub code: String,
    pub name: String,
    pub kind: AccountKind,
    pub parent: Option<AccountId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJournal {
    pub code: String,
    pub name: String,
    pub kind: JournalKind,
    pub prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSeries {
    pub kind: DocumentKind,
    pub code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLine {
    pub account: AccountId,
    pub description: String,
    pub debit: Money,
    pub credit: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEntry {
    pub journal: JournalId,
    pub date: NaiveDate,
    pub memo: String,
    pub period: Option<PeriodId>,
    pub lines: Vec<NewLine>,
}

/// Request to derive an entry from an external document's totals. The
/// account ids are the mapping hints supplied by the invoicing subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocumentEntry {
    pub journal: JournalId,
    pub date: NaiveDate,
    pub memo: String,
    pub totals: SourceDocumentTotals,
    pub receivable_account: AccountId,
    pub revenue_account: AccountId,
    pub tax_account: AccountId,
}
