//! Monetary amounts in the smallest currency unit.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::value_object::ValueObject;

/// Signed monetary amount in céntimos (e.g. `15_000` == `150.00`).
///
/// Keeping amounts integral makes the balance check exact: the "epsilon" of
/// one currency unit collapses to plain equality. Arithmetic is checked —
/// overflow is an invariant violation, never a silent wrap.
#[derive(
    Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, other: Money) -> DomainResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::validation("monetary amount overflow"))
    }

    pub fn checked_sub(self, other: Money) -> DomainResult<Money> {
        self.0
            .checked_sub(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::validation("monetary amount overflow"))
    }

    /// Sum a sequence of amounts with overflow checking.
    pub fn checked_sum(amounts: impl IntoIterator<Item = Money>) -> DomainResult<Money> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, m| acc.checked_add(m))
    }
}

impl ValueObject for Money {}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn displays_as_decimal_with_two_places() {
        assert_eq!(Money::from_cents(15_000).to_string(), "150.00");
        assert_eq!(Money::from_cents(5).to_string(), "0.05");
        assert_eq!(Money::from_cents(-1_234).to_string(), "-12.34");
        assert_eq!(Money::ZERO.to_string(), "0.00");
    }

    #[test]
    fn overflow_is_reported_not_wrapped() {
        let err = Money::from_cents(i64::MAX)
            .checked_add(Money::from_cents(1))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    proptest! {
        #[test]
        fn sum_of_negations_is_zero(cents in -1_000_000i64..1_000_000i64) {
            let m = Money::from_cents(cents);
            let n = Money::from_cents(-cents);
            prop_assert_eq!(m.checked_add(n).unwrap(), Money::ZERO);
        }
    }
}
