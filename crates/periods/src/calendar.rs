//! The period calendar of one tenant: creation, closing, reopening.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use contable_core::{DomainError, DomainResult, PeriodId, UserId};

use crate::period::{AccountingPeriod, PeriodStatus};

/// Result of a bulk period creation: what was added, what already existed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkCreateReport {
    pub created: Vec<PeriodId>,
    pub skipped_months: Vec<u8>,
}

/// All accounting periods of one tenant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodCalendar {
    periods: HashMap<PeriodId, AccountingPeriod>,
}

impl PeriodCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: PeriodId) -> DomainResult<&AccountingPeriod> {
        self.periods.get(&id).ok_or_else(DomainError::not_found)
    }

    pub fn find(&self, month: u8, year: i32) -> Option<&AccountingPeriod> {
        self.periods
            .values()
            .find(|p| p.month == month && p.year == year)
    }

    /// Period whose month contains `date`, if configured.
    pub fn period_for_date(&self, date: NaiveDate) -> Option<&AccountingPeriod> {
        self.periods.values().find(|p| p.contains(date))
    }

    /// Period containing "today".
    pub fn current(&self, today: NaiveDate) -> Option<&AccountingPeriod> {
        self.period_for_date(today)
    }

    /// Create a single period. Uniqueness per (month, year) is enforced here
    /// and backstopped by the store schema.
    pub fn create(&mut self, id: PeriodId, month: u8, year: i32) -> DomainResult<&AccountingPeriod> {
        let period = AccountingPeriod::new(id, month, year)?;
        if self.find(month, year).is_some() {
            return Err(DomainError::conflict(format!(
                "period {month:02}/{year} already exists"
            )));
        }
        self.periods.insert(id, period);
        Ok(&self.periods[&id])
    }

    /// Create the missing periods among `months`, skipping existing ones.
    ///
    /// Existing periods are never touched, whatever their state.
    pub fn bulk_create(
        &mut self,
        year: i32,
        months: &[u8],
        mut make_id: impl FnMut() -> PeriodId,
    ) -> DomainResult<BulkCreateReport> {
        let mut report = BulkCreateReport {
            created: Vec::new(),
            skipped_months: Vec::new(),
        };
        for &month in months {
            if self.find(month, year).is_some() {
                report.skipped_months.push(month);
                continue;
            }
            let id = make_id();
            self.create(id, month, year)?;
            report.created.push(id);
        }
        Ok(report)
    }

    /// Close a period. `draft_count` is the number of draft entries dated in
    /// the period, resolved by the caller against the ledger.
    pub fn close(
        &mut self,
        id: PeriodId,
        draft_count: usize,
        closed_by: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        let period = self.get(id)?;
        if period.status == PeriodStatus::Closed {
            return Err(DomainError::invalid_state(format!(
                "period {:02}/{} is already closed",
                period.month, period.year
            )));
        }
        if draft_count > 0 {
            return Err(DomainError::HasDraftEntries(draft_count));
        }
        if let Some(period) = self.periods.get_mut(&id) {
            period.mark_closed(closed_by, now);
        }
        Ok(())
    }

    /// Reopen a period. Periods reopen in reverse chronological order: a
    /// closed later period blocks the reopen.
    pub fn reopen(&mut self, id: PeriodId) -> DomainResult<()> {
        let period = self.get(id)?;
        if period.status == PeriodStatus::Open {
            return Err(DomainError::invalid_state(format!(
                "period {:02}/{} is already open",
                period.month, period.year
            )));
        }
        let ordinal = period.ordinal();
        if let Some(later) = self
            .periods
            .values()
            .filter(|p| p.ordinal() > ordinal && p.status == PeriodStatus::Closed)
            .min_by_key(|p| p.ordinal())
        {
            return Err(DomainError::LaterPeriodClosed {
                month: later.month,
                year: later.year,
            });
        }
        if let Some(period) = self.periods.get_mut(&id) {
            period.mark_open();
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = &AccountingPeriod> {
        self.periods.values()
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calendar_with(months: &[u8], year: i32) -> (PeriodCalendar, Vec<PeriodId>) {
        let mut calendar = PeriodCalendar::new();
        let ids: Vec<PeriodId> = months
            .iter()
            .map(|&m| {
                let id = PeriodId::new();
                calendar.create(id, m, year).unwrap();
                id
            })
            .collect();
        (calendar, ids)
    }

    #[test]
    fn duplicate_month_year_is_a_conflict() {
        let (mut calendar, _) = calendar_with(&[1], 2026);
        let err = calendar.create(PeriodId::new(), 1, 2026).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn bulk_create_skips_existing_periods() {
        let (mut calendar, _) = calendar_with(&[2], 2026);
        let report = calendar
            .bulk_create(2026, &[1, 2, 3], PeriodId::new)
            .unwrap();
        assert_eq!(report.created.len(), 2);
        assert_eq!(report.skipped_months, vec![2]);
        assert_eq!(calendar.len(), 3);
    }

    #[test]
    fn close_with_zero_entries_succeeds_and_stamps_closer() {
        let (mut calendar, ids) = calendar_with(&[1], 2026);
        let user = UserId::new();
        calendar.close(ids[0], 0, user, Utc::now()).unwrap();
        let period = calendar.get(ids[0]).unwrap();
        assert_eq!(period.status, PeriodStatus::Closed);
        assert_eq!(period.closed_by, Some(user));
        assert!(period.closed_at.is_some());
    }

    #[test]
    fn close_with_draft_entries_fails() {
        let (mut calendar, ids) = calendar_with(&[1], 2026);
        let err = calendar
            .close(ids[0], 1, UserId::new(), Utc::now())
            .unwrap_err();
        assert_eq!(err, DomainError::HasDraftEntries(1));
    }

    #[test]
    fn closing_twice_is_an_invalid_state() {
        let (mut calendar, ids) = calendar_with(&[1], 2026);
        calendar.close(ids[0], 0, UserId::new(), Utc::now()).unwrap();
        let err = calendar
            .close(ids[0], 0, UserId::new(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[test]
    fn reopen_blocked_by_closed_later_period() {
        let (mut calendar, ids) = calendar_with(&[1, 2], 2026);
        let user = UserId::new();
        calendar.close(ids[0], 0, user, Utc::now()).unwrap();
        calendar.close(ids[1], 0, user, Utc::now()).unwrap();

        let err = calendar.reopen(ids[0]).unwrap_err();
        assert_eq!(
            err,
            DomainError::LaterPeriodClosed { month: 2, year: 2026 }
        );

        // Reverse chronological order works.
        calendar.reopen(ids[1]).unwrap();
        calendar.reopen(ids[0]).unwrap();
        assert!(calendar.get(ids[0]).unwrap().is_open());
    }

    #[test]
    fn reopen_considers_later_years() {
        let mut calendar = PeriodCalendar::new();
        let dec = PeriodId::new();
        let jan = PeriodId::new();
        calendar.create(dec, 12, 2025).unwrap();
        calendar.create(jan, 1, 2026).unwrap();
        let user = UserId::new();
        calendar.close(dec, 0, user, Utc::now()).unwrap();
        calendar.close(jan, 0, user, Utc::now()).unwrap();

        let err = calendar.reopen(dec).unwrap_err();
        assert_eq!(err, DomainError::LaterPeriodClosed { month: 1, year: 2026 });
    }

    #[test]
    fn current_finds_the_containing_period() {
        let (calendar, ids) = calendar_with(&[6, 7], 2026);
        let today = NaiveDate::from_ymd_opt(2026, 7, 9).unwrap();
        assert_eq!(calendar.current(today).map(|p| p.id), Some(ids[1]));
        let outside = NaiveDate::from_ymd_opt(2026, 9, 1).unwrap();
        assert!(calendar.current(outside).is_none());
    }
}
