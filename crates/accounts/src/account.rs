//! Account metadata and code rules.

use serde::{Deserialize, Serialize};

use contable_core::{AccountId, DomainError, DomainResult, Entity, ValueObject};

/// Maximum hierarchy depth.
pub const MAX_LEVEL: u8 = 7;

/// Accounts at this level or deeper are auxiliary (posting-eligible).
pub const AUXILIARY_LEVEL: u8 = 4;

/// High-level account classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    Asset,
    Liability,
    Equity,
    Income,
    Expense,
}

/// Hierarchical account code (e.g. `"1010101"`).
///
/// Codes are plain digit strings; a child's code extends its parent's code,
/// so `"10101"` is an ancestor of `"1010101"` by shape alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountCode(String);

impl AccountCode {
    pub fn new(code: impl Into<String>) -> DomainResult<Self> {
        let code = code.into();
        if code.is_empty() {
            return Err(DomainError::validation("account code must not be empty"));
        }
        if code.len() > 14 {
            return Err(DomainError::validation(
                "account code exceeds 14 digits",
            ));
        }
        if !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::validation(
                "account code must contain only digits",
            ));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if `self` is a proper prefix of `other` (ancestor by shape).
    pub fn is_prefix_of(&self, other: &AccountCode) -> bool {
        other.0.len() > self.0.len() && other.0.starts_with(&self.0)
    }
}

impl ValueObject for AccountCode {}

impl core::fmt::Display for AccountCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A node in the chart of accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub code: AccountCode,
    pub name: String,
    pub kind: AccountKind,
    /// Weak back-reference: the parent does not own its children.
    pub parent: Option<AccountId>,
    /// Depth in the hierarchy; roots are level 1. Recomputed on reparent.
    pub level: u8,
}

impl Account {
    /// Posting-eligible leaf classification.
    pub fn is_auxiliary(&self) -> bool {
        self.level >= AUXILIARY_LEVEL
    }
}

impl Entity for Account {
    type Id = AccountId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
