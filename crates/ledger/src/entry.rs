//! Journal entries (asientos) and their draft → posted → voided lifecycle.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use contable_accounts::Account;
use contable_core::{AccountId, DomainError, DomainResult, Entity, EntryId, JournalId, LineId, Money, PeriodId};
use contable_periods::AccountingPeriod;

use crate::source::SourceDocumentId;

/// Entry lifecycle. Posted and voided are terminal except that a posted
/// entry may still be voided; nothing ever returns to draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Draft,
    Posted,
    Voided,
}

impl EntryStatus {
    /// Database/wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            EntryStatus::Draft => "draft",
            EntryStatus::Posted => "posted",
            EntryStatus::Voided => "voided",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "draft" => Some(EntryStatus::Draft),
            "posted" => Some(EntryStatus::Posted),
            "voided" => Some(EntryStatus::Voided),
            _ => None,
        }
    }
}

/// One debit-or-credit movement against an auxiliary account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    pub id: LineId,
    pub account: AccountId,
    pub description: String,
    pub debit: Money,
    pub credit: Money,
}

impl JournalLine {
    /// Exactly one of debit/credit strictly positive, the other exactly zero.
    pub fn validate_amounts(debit: Money, credit: Money) -> DomainResult<()> {
        let debit_set = debit.is_positive() && credit.is_zero();
        let credit_set = credit.is_positive() && debit.is_zero();
        if debit_set || credit_set {
            Ok(())
        } else {
            Err(DomainError::AmbiguousAmount)
        }
    }

    /// Debit-positive signed amount.
    pub fn signed_amount(&self) -> Money {
        Money::from_cents(self.debit.cents() - self.credit.cents())
    }
}

/// A balanced (once posted) set of journal lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: EntryId,
    pub journal: JournalId,
    pub date: NaiveDate,
    pub memo: String,
    number: Option<String>,
    status: EntryStatus,
    lines: Vec<JournalLine>,
    total_debit: Money,
    total_haber: Money,
    pub period: Option<PeriodId>,
    pub source_document: Option<SourceDocumentId>,
    posted_at: Option<DateTime<Utc>>,
    voided_at: Option<DateTime<Utc>>,
}

impl JournalEntry {
    pub fn new(id: EntryId, journal: JournalId, date: NaiveDate, memo: impl Into<String>) -> Self {
        Self {
            id,
            journal,
            date,
            memo: memo.into(),
            number: None,
            status: EntryStatus::Draft,
            lines: Vec::new(),
            total_debit: Money::ZERO,
            total_haber: Money::ZERO,
            period: None,
            source_document: None,
            posted_at: None,
            voided_at: None,
        }
    }

    pub fn status(&self) -> EntryStatus {
        self.status
    }

    pub fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    pub fn lines(&self) -> &[JournalLine] {
        &self.lines
    }

    pub fn total_debit(&self) -> Money {
        self.total_debit
    }

    pub fn total_haber(&self) -> Money {
        self.total_haber
    }

    pub fn posted_at(&self) -> Option<DateTime<Utc>> {
        self.posted_at
    }

    pub fn voided_at(&self) -> Option<DateTime<Utc>> {
        self.voided_at
    }

    pub fn is_draft(&self) -> bool {
        self.status == EntryStatus::Draft
    }

    /// True while lines may still be added/edited/removed.
    fn ensure_draft(&self, action: &str) -> DomainResult<()> {
        match self.status {
            EntryStatus::Draft => Ok(()),
            EntryStatus::Posted => Err(DomainError::invalid_state(format!(
                "entry is posted and frozen; cannot {action}"
            ))),
            EntryStatus::Voided => Err(DomainError::invalid_state(format!(
                "entry is voided; cannot {action}"
            ))),
        }
    }

    /// Add a line against an auxiliary account. Draft only.
    pub fn add_line(
        &mut self,
        line_id: LineId,
        account: &Account,
        description: impl Into<String>,
        debit: Money,
        credit: Money,
    ) -> DomainResult<()> {
        self.ensure_draft("add a line")?;
        if !account.is_auxiliary() {
            return Err(DomainError::NotAuxiliaryAccount(account.code.to_string()));
        }
        JournalLine::validate_amounts(debit, credit)?;
        self.lines.push(JournalLine {
            id: line_id,
            account: account.id,
            description: description.into(),
            debit,
            credit,
        });
        self.recalculate_totals()
    }

    /// Change a line's amounts (and optionally its description). Draft only.
    pub fn update_line(
        &mut self,
        line_id: LineId,
        debit: Money,
        credit: Money,
        description: Option<String>,
    ) -> DomainResult<()> {
        self.ensure_draft("update a line")?;
        JournalLine::validate_amounts(debit, credit)?;
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or_else(DomainError::not_found)?;
        line.debit = debit;
        line.credit = credit;
        if let Some(description) = description {
            line.description = description;
        }
        self.recalculate_totals()
    }

    /// Remove a line. Draft only.
    pub fn remove_line(&mut self, line_id: LineId) -> DomainResult<()> {
        self.ensure_draft("remove a line")?;
        let before = self.lines.len();
        self.lines.retain(|l| l.id != line_id);
        if self.lines.len() == before {
            return Err(DomainError::not_found());
        }
        self.recalculate_totals()
    }

    /// Recompute both totals from the current lines. Pure and idempotent.
    pub fn recalculate_totals(&mut self) -> DomainResult<()> {
        self.total_debit = Money::checked_sum(self.lines.iter().map(|l| l.debit))?;
        self.total_haber = Money::checked_sum(self.lines.iter().map(|l| l.credit))?;
        Ok(())
    }

    /// Debits equal credits, exact to the céntimo.
    pub fn is_balanced(&self) -> bool {
        self.total_debit == self.total_haber
    }

    /// Post the entry: assign its number, stamp the time, freeze the lines.
    ///
    /// The caller passes the period resolved for `self.period` (if linked)
    /// and the number drawn from the journal's correlative inside the same
    /// transaction.
    pub fn post(
        &mut self,
        number: String,
        period: Option<&AccountingPeriod>,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        match self.status {
            EntryStatus::Posted => return Err(DomainError::AlreadyPosted),
            EntryStatus::Voided => return Err(DomainError::AlreadyVoided),
            EntryStatus::Draft => {}
        }
        if self.lines.len() < 2 {
            return Err(DomainError::validation(
                "entry needs at least two lines to post",
            ));
        }
        if !self.is_balanced() {
            return Err(DomainError::Unbalanced {
                debit: self.total_debit,
                haber: self.total_haber,
            });
        }
        if let Some(period) = period {
            if !period.is_open() {
                return Err(DomainError::PeriodClosed {
                    month: period.month,
                    year: period.year,
                });
            }
        }
        self.number = Some(number);
        self.posted_at = Some(now);
        self.status = EntryStatus::Posted;
        Ok(())
    }

    /// Void the entry. Allowed from draft or posted; rows are kept for audit.
    pub fn void(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == EntryStatus::Voided {
            return Err(DomainError::AlreadyVoided);
        }
        self.status = EntryStatus::Voided;
        self.voided_at = Some(now);
        Ok(())
    }

    /// A fresh draft with the same lines: no number, no stamps, totals
    /// recomputed from the copied lines.
    pub fn duplicate(
        &self,
        new_id: EntryId,
        mut make_line_id: impl FnMut() -> LineId,
    ) -> DomainResult<JournalEntry> {
        let mut copy = JournalEntry::new(new_id, self.journal, self.date, self.memo.clone());
        copy.period = self.period;
        copy.lines = self
            .lines
            .iter()
            .map(|l| JournalLine {
                id: make_line_id(),
                account: l.account,
                description: l.description.clone(),
                debit: l.debit,
                credit: l.credit,
            })
            .collect();
        copy.recalculate_totals()?;
        Ok(copy)
    }

    /// Rebuild an entry from stored rows. Totals are recomputed from the
    /// lines rather than trusted.
    #[allow(clippy::too_many_arguments)]
    pub fn rehydrate(
        id: EntryId,
        journal: JournalId,
        date: NaiveDate,
        memo: String,
        number: Option<String>,
        status: EntryStatus,
        lines: Vec<JournalLine>,
        period: Option<PeriodId>,
        source_document: Option<SourceDocumentId>,
        posted_at: Option<DateTime<Utc>>,
        voided_at: Option<DateTime<Utc>>,
    ) -> DomainResult<Self> {
        let mut entry = Self {
            id,
            journal,
            date,
            memo,
            number,
            status,
            lines,
            total_debit: Money::ZERO,
            total_haber: Money::ZERO,
            period,
            source_document,
            posted_at,
            voided_at,
        };
        entry.recalculate_totals()?;
        Ok(entry)
    }

    pub(crate) fn link_source_document(&mut self, document: SourceDocumentId) {
        self.source_document = Some(document);
    }

    /// True if any line touches `account`.
    pub fn references_account(&self, account: AccountId) -> bool {
        self.lines.iter().any(|l| l.account == account)
    }
}

impl Entity for JournalEntry {
    type Id = EntryId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
