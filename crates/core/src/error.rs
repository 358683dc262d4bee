//! Domain error model.

use thiserror::Error;

use crate::money::Money;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every validation failure carries a dedicated variant naming the violated
/// invariant, so callers can match on the kind instead of parsing messages.
/// Infrastructure concerns (connection loss, SQL syntax, pool exhaustion)
/// belong elsewhere; the only storage-shaped variant here is `Storage`, the
/// fatal report for a constraint violation that slipped past the
/// application-level checks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found")]
    NotFound,

    /// A conflict occurred (e.g. duplicate code, concurrent writer).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The account hierarchy rules were violated (level, kind, code shape).
    #[error("invalid hierarchy: {0}")]
    InvalidHierarchy(String),

    /// A reparent would make an account its own ancestor.
    #[error("cyclic reference: an account cannot be moved under itself or a descendant")]
    CyclicReference,

    /// The account still has child accounts.
    #[error("account has child accounts and cannot be deleted")]
    HasChildren,

    /// The account is referenced by journal lines.
    #[error("account has ledger movements and cannot be deleted")]
    HasMovements,

    /// An operation was attempted in a state that forbids it.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Journal lines may only target auxiliary (posting-eligible) accounts.
    #[error("account {0} is not auxiliary; only auxiliary accounts receive journal lines")]
    NotAuxiliaryAccount(String),

    /// A line must carry exactly one of debit/credit, strictly positive.
    #[error("exactly one of debit or credit must be strictly positive")]
    AmbiguousAmount,

    /// Debits do not equal credits.
    #[error("entry is unbalanced: debit {debit} != haber {haber}")]
    Unbalanced { debit: Money, haber: Money },

    /// The linked accounting period is closed.
    #[error("accounting period {month:02}/{year} is closed")]
    PeriodClosed { month: u8, year: i32 },

    /// The entry was already posted.
    #[error("entry is already posted")]
    AlreadyPosted,

    /// The entry was already voided.
    #[error("entry is already voided")]
    AlreadyVoided,

    /// The period still contains draft entries.
    #[error("period has {0} draft entries; post or void them before closing")]
    HasDraftEntries(usize),

    /// A chronologically later period is still closed.
    #[error("a later period ({month:02}/{year}) is closed; periods reopen in chronological order")]
    LaterPeriodClosed { month: u8, year: i32 },

    /// A counter reset below the highest number already consumed.
    #[error("cannot reset counter to {requested}: {issued} was already issued")]
    BelowIssuedMaximum { requested: u64, issued: u64 },

    /// The source document already owns a journal entry.
    #[error("source document is already linked to a journal entry")]
    AlreadyLinked,

    /// A store-level constraint violation surfaced on commit. Fatal: it means
    /// an application-level check was missed. Never silently swallowed.
    #[error("integrity violation reported by the store: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn invalid_hierarchy(msg: impl Into<String>) -> Self {
        Self::InvalidHierarchy(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// True for errors a bounded retry may resolve (concurrent writers).
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
