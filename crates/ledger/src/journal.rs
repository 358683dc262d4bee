//! Journals: the books that entries are numbered into.

use serde::{Deserialize, Serialize};

use contable_core::{DomainError, DomainResult, Entity, JournalId};
use contable_numbering::{NumberFormat, SequenceCounter};

/// How entries arrive in this journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalKind {
    /// Entries typed in by an accountant.
    Manual,
    /// Entries derived from source documents (invoices etc.).
    Automatic,
}

/// A book of journal entries with its own correlative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    pub id: JournalId,
    pub code: String,
    pub name: String,
    pub kind: JournalKind,
    format: NumberFormat,
    correlative: SequenceCounter,
}

impl Journal {
    pub fn new(
        id: JournalId,
        code: impl Into<String>,
        name: impl Into<String>,
        kind: JournalKind,
        prefix: &str,
    ) -> DomainResult<Self> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(DomainError::validation("journal code must not be empty"));
        }
        Ok(Self {
            id,
            code,
            name: name.into(),
            kind,
            format: NumberFormat::with_default_padding(prefix)?,
            correlative: SequenceCounter::default(),
        })
    }

    pub fn correlative(&self) -> u64 {
        self.correlative.current()
    }

    pub fn prefix(&self) -> &str {
        self.format.prefix()
    }

    /// Draw the next entry number and render it (`DV-00000123`).
    ///
    /// Must be called inside the transaction that persists the consuming
    /// entry; the store serializes callers on this journal.
    pub fn next_number(&mut self) -> (u64, String) {
        let value = self.correlative.next();
        (value, self.format.format(value))
    }

    pub fn format(&self, value: u64) -> String {
        self.format.format(value)
    }

    /// Rewind/forward the correlative; below the issued maximum is rejected.
    pub fn reset_correlative(&mut self, new_value: u64) -> DomainResult<()> {
        self.correlative.reset(new_value)
    }

    #[doc(hidden)]
    pub fn with_correlative(mut self, value: u64) -> Self {
        self.correlative = SequenceCounter::new(value);
        self
    }
}

impl Entity for Journal {
    type Id = JournalId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
