//! Sequential numbering: correlatives for journals and document series.
//!
//! The types here are pure values; atomicity of `next` is the store's
//! concern — the increment always runs inside the same transaction that
//! persists the consuming entity, so an aborted consumer never burns a
//! number visibly and a committed one never reuses it.

pub mod counter;
pub mod format;
pub mod series;

pub use counter::SequenceCounter;
pub use format::NumberFormat;
pub use series::{DocumentKind, DocumentSeries, SeriesCode};
