//! Rendering correlative values as document numbers.

use serde::{Deserialize, Serialize};

use contable_core::{DomainError, DomainResult, ValueObject};

/// Prefix + zero padding, e.g. `DV-00000123` or `F001-00000045`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberFormat {
    prefix: String,
    padding: usize,
}

impl NumberFormat {
    pub const DEFAULT_PADDING: usize = 8;

    pub fn new(prefix: impl Into<String>, padding: usize) -> DomainResult<Self> {
        let prefix = prefix.into();
        if prefix.is_empty() {
            return Err(DomainError::validation("number prefix must not be empty"));
        }
        if !(1..=10).contains(&padding) {
            return Err(DomainError::validation(
                "number padding must be between 1 and 10 digits",
            ));
        }
        Ok(Self { prefix, padding })
    }

    pub fn with_default_padding(prefix: impl Into<String>) -> DomainResult<Self> {
        Self::new(prefix, Self::DEFAULT_PADDING)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn format(&self, value: u64) -> String {
        format!("{}-{:0width$}", self.prefix, value, width = self.padding)
    }
}

impl ValueObject for NumberFormat {}
