//! The monotonic correlative counter.

use serde::{Deserialize, Serialize};

use contable_core::{DomainError, DomainResult};

/// A strictly monotonic counter.
///
/// `value` is the highest number ever handed out (0 = nothing issued).
/// The counter itself is a plain value: concurrent callers are serialized by
/// the store (per-tenant single writer in memory, a `FOR UPDATE` row lock in
/// Postgres), and the increment commits or rolls back together with the
/// entity that consumed the number.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceCounter {
    value: u64,
}

impl SequenceCounter {
    pub fn new(value: u64) -> Self {
        Self { value }
    }

    /// Highest number issued so far.
    pub fn current(&self) -> u64 {
        self.value
    }

    /// Hand out the next number, strictly greater than every previous one.
    pub fn next(&mut self) -> u64 {
        self.value += 1;
        self.value
    }

    /// Move the counter. Rewinding below the highest issued number would
    /// mint duplicates retroactively and is rejected.
    pub fn reset(&mut self, new_value: u64) -> DomainResult<()> {
        if new_value < self.value {
            return Err(DomainError::BelowIssuedMaximum {
                requested: new_value,
                issued: self.value,
            });
        }
        self.value = new_value;
        Ok(())
    }
}
