//! A single accounting period (one calendar month of one tenant).

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use contable_core::{DomainError, DomainResult, Entity, PeriodId, UserId};

/// Period lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodStatus {
    Open,
    Closed,
}

/// A month/year posting window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountingPeriod {
    pub id: PeriodId,
    /// 1..=12.
    pub month: u8,
    pub year: i32,
    pub status: PeriodStatus,
    pub closed_by: Option<UserId>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl AccountingPeriod {
    pub fn new(id: PeriodId, month: u8, year: i32) -> DomainResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::validation(format!(
                "month {month} is outside 1..=12"
            )));
        }
        if !(1900..=2200).contains(&year) {
            return Err(DomainError::validation(format!(
                "year {year} is outside the supported range"
            )));
        }
        Ok(Self {
            id,
            month,
            year,
            status: PeriodStatus::Open,
            closed_by: None,
            closed_at: None,
        })
    }

    pub fn is_open(&self) -> bool {
        self.status == PeriodStatus::Open
    }

    /// First day of the month.
    pub fn start(&self) -> NaiveDate {
        // Month/year are range-checked at construction.
        NaiveDate::from_ymd_opt(self.year, self.month as u32, 1)
            .unwrap_or(NaiveDate::MIN)
    }

    /// Last day of the month.
    pub fn end(&self) -> NaiveDate {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month as u32 + 1)
        };
        NaiveDate::from_ymd_opt(next_year, next_month, 1)
            .and_then(|d| d.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month as u32
    }

    /// Chronological ordering key.
    pub fn ordinal(&self) -> (i32, u8) {
        (self.year, self.month)
    }

    pub(crate) fn mark_closed(&mut self, closed_by: UserId, now: DateTime<Utc>) {
        self.status = PeriodStatus::Closed;
        self.closed_by = Some(closed_by);
        self.closed_at = Some(now);
    }

    pub(crate) fn mark_open(&mut self) {
        self.status = PeriodStatus::Open;
        self.closed_by = None;
        self.closed_at = None;
    }
}

impl Entity for AccountingPeriod {
    type Id = PeriodId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn month_and_year_are_range_checked() {
        assert!(AccountingPeriod::new(PeriodId::new(), 0, 2026).is_err());
        assert!(AccountingPeriod::new(PeriodId::new(), 13, 2026).is_err());
        assert!(AccountingPeriod::new(PeriodId::new(), 6, 2026).is_ok());
    }

    #[test]
    fn date_range_covers_the_whole_month() {
        let feb = AccountingPeriod::new(PeriodId::new(), 2, 2024).unwrap();
        assert_eq!(feb.start(), NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(feb.end(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let dec = AccountingPeriod::new(PeriodId::new(), 12, 2025).unwrap();
        assert_eq!(dec.end(), NaiveDate::from_ymd_opt(2025, 12, 31).unwrap());
    }

    #[test]
    fn contains_matches_only_its_own_month() {
        let p = AccountingPeriod::new(PeriodId::new(), 3, 2026).unwrap();
        assert!(p.contains(NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()));
        assert!(!p.contains(NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()));
        assert!(!p.contains(NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()));
    }

    proptest! {
        /// Every month window is a closed range covering exactly its dates.
        #[test]
        fn month_windows_cover_their_own_dates(month in 1u8..=12, year in 1990i32..2100) {
            let p = AccountingPeriod::new(PeriodId::new(), month, year).unwrap();
            prop_assert!(p.start() <= p.end());
            prop_assert!(p.contains(p.start()));
            prop_assert!(p.contains(p.end()));
            let after = p.end().succ_opt().unwrap();
            prop_assert!(!p.contains(after));
        }
    }
}
