//! Document series: invoice-style numbering, parallel to journal correlatives.

use serde::{Deserialize, Serialize};

use contable_core::{DomainError, DomainResult, Entity, SeriesId, ValueObject};

use crate::counter::SequenceCounter;
use crate::format::NumberFormat;

/// Kind of numbered commercial document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Invoice,
    Receipt,
    CreditNote,
    DebitNote,
}

impl DocumentKind {
    /// Leading letter a series code of this kind must carry.
    pub fn series_letter(self) -> char {
        match self {
            DocumentKind::Invoice => 'F',
            DocumentKind::Receipt => 'B',
            DocumentKind::CreditNote => 'N',
            DocumentKind::DebitNote => 'D',
        }
    }
}

/// Series code: one uppercase letter plus three digits (`F001`, `B012`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesCode(String);

impl SeriesCode {
    pub fn new(code: impl Into<String>, kind: DocumentKind) -> DomainResult<Self> {
        let code = code.into();
        let bytes = code.as_bytes();
        let shape_ok = bytes.len() == 4
            && bytes[0].is_ascii_uppercase()
            && bytes[1..].iter().all(u8::is_ascii_digit);
        if !shape_ok {
            return Err(DomainError::validation(format!(
                "series code {code:?} must be one uppercase letter plus three digits"
            )));
        }
        if bytes[0] as char != kind.series_letter() {
            return Err(DomainError::validation(format!(
                "series code {code} does not match document kind (expected leading {})",
                kind.series_letter()
            )));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl ValueObject for SeriesCode {}

impl core::fmt::Display for SeriesCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A numbering series for one document kind of one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSeries {
    pub id: SeriesId,
    pub kind: DocumentKind,
    pub code: SeriesCode,
    correlative: SequenceCounter,
}

impl DocumentSeries {
    pub fn new(id: SeriesId, kind: DocumentKind, code: &str) -> DomainResult<Self> {
        Ok(Self {
            id,
            kind,
            code: SeriesCode::new(code, kind)?,
            correlative: SequenceCounter::default(),
        })
    }

    pub fn correlative(&self) -> u64 {
        self.correlative.current()
    }

    /// Draw the next number and render it (`F001-00000045`).
    pub fn next_number(&mut self) -> DomainResult<(u64, String)> {
        let value = self.correlative.next();
        Ok((value, self.format(value)?))
    }

    pub fn format(&self, value: u64) -> DomainResult<String> {
        Ok(NumberFormat::with_default_padding(self.code.as_str())?.format(value))
    }

    /// Rewind/forward the correlative; below the issued maximum is rejected.
    pub fn reset(&mut self, new_value: u64) -> DomainResult<()> {
        self.correlative.reset(new_value)
    }

    #[doc(hidden)]
    pub fn with_correlative(mut self, value: u64) -> Self {
        self.correlative = SequenceCounter::new(value);
        self
    }
}

impl Entity for DocumentSeries {
    type Id = SeriesId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_code_shape_is_enforced() {
        assert!(SeriesCode::new("F001", DocumentKind::Invoice).is_ok());
        assert!(SeriesCode::new("F01", DocumentKind::Invoice).is_err());
        assert!(SeriesCode::new("f001", DocumentKind::Invoice).is_err());
        assert!(SeriesCode::new("F0011", DocumentKind::Invoice).is_err());
        assert!(SeriesCode::new("FA01", DocumentKind::Invoice).is_err());
    }

    #[test]
    fn series_code_letter_must_match_kind() {
        assert!(SeriesCode::new("B001", DocumentKind::Receipt).is_ok());
        let err = SeriesCode::new("F001", DocumentKind::Receipt).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn sequential_draws_from_a_seeded_series() {
        let mut series = DocumentSeries::new(SeriesId::new(), DocumentKind::Invoice, "F001")
            .unwrap()
            .with_correlative(5);
        let (a, formatted_a) = series.next_number().unwrap();
        let (b, formatted_b) = series.next_number().unwrap();
        assert_eq!((a, b), (6, 7));
        assert_eq!(formatted_a, "F001-00000006");
        assert_eq!(formatted_b, "F001-00000007");
    }

    #[test]
    fn reset_below_issued_maximum_is_rejected() {
        let mut series = DocumentSeries::new(SeriesId::new(), DocumentKind::Invoice, "F001")
            .unwrap()
            .with_correlative(9);
        let err = series.reset(3).unwrap_err();
        assert!(matches!(err, DomainError::BelowIssuedMaximum { .. }));
        series.reset(20).unwrap();
        assert_eq!(series.next_number().unwrap().0, 21);
    }
}
