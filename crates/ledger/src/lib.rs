//! Double-entry journal: journals, entries (asientos) and their lifecycle.
//!
//! Pure domain logic only: no IO, no persistence concerns. Atomicity of
//! posting (counter increment + entry freeze + balance invalidation) is
//! orchestrated by the infra service inside one store transaction.

pub mod entry;
pub mod journal;
pub mod source;

pub use entry::{EntryStatus, JournalEntry, JournalLine};
pub use journal::{Journal, JournalKind};
pub use source::{entry_from_source_document, SourceDocumentId, SourceDocumentTotals};
