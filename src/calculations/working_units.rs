use chrono::{Duration, NaiveDate};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use thiserror::Error;

use crate::calendar::WorkCalendar;
use crate::time_unit::{TimeDuration, TimeUnit, TimeUnitError, TimeUnitStack};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date range: {start} is after {end}")]
pub struct InvalidRangeError {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CountError {
    #[error(transparent)]
    InvalidRange(#[from] InvalidRangeError),
    #[error(transparent)]
    TimeUnit(#[from] TimeUnitError),
}

/// Counts working time between dates.
///
/// Results are memoised per `(start, end)` and dropped as soon as the
/// calendar reports a different revision, so a cached count never outlives
/// the calendar state it was computed from. The memo holds at most
/// `CACHE_LIMIT` ranges and starts over once full.
const CACHE_LIMIT: usize = 4096;

#[derive(Debug, Default)]
pub struct WorkingUnitCounter {
    cache: RefCell<HashMap<(NaiveDate, NaiveDate), i64>>,
    revision: Cell<Option<u64>>,
}

impl WorkingUnitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Working time in `[start, end)` expressed in `unit`.
    pub fn count(
        &self,
        calendar: &WorkCalendar,
        units: &TimeUnitStack,
        unit: &TimeUnit,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeDuration, CountError> {
        let days = self.working_days(calendar, start, end)?;
        let per_unit = units.days_in(1.0, unit, start)?;
        Ok(TimeDuration::new(days as f64 / per_unit, unit.clone()))
    }

    /// Number of working days in `[start, end)`.
    pub fn working_days(
        &self,
        calendar: &WorkCalendar,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<i64, InvalidRangeError> {
        if start > end {
            return Err(InvalidRangeError { start, end });
        }
        self.sync(calendar);
        if let Some(days) = self.cache.borrow().get(&(start, end)) {
            return Ok(*days);
        }
        let mut days = 0;
        let mut current = start;
        while current < end {
            if calendar.is_working_day(current) {
                days += 1;
            }
            current = current + Duration::days(1);
        }
        let mut cache = self.cache.borrow_mut();
        if cache.len() >= CACHE_LIMIT {
            cache.clear();
        }
        cache.insert((start, end), days);
        Ok(days)
    }

    /// Working days from `from` to `to`, negative when `to` is earlier.
    pub fn signed_working_days(&self, calendar: &WorkCalendar, from: NaiveDate, to: NaiveDate) -> i64 {
        if from <= to {
            self.working_days(calendar, from, to).unwrap_or(0)
        } else {
            -self.working_days(calendar, to, from).unwrap_or(0)
        }
    }

    pub fn invalidate(&self) {
        self.cache.borrow_mut().clear();
        self.revision.set(None);
    }

    fn sync(&self, calendar: &WorkCalendar) {
        if self.revision.get() != Some(calendar.revision()) {
            self.cache.borrow_mut().clear();
            self.revision.set(Some(calendar.revision()));
        }
    }
}
