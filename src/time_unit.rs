//! Time units and the composition graph between them.
//!
//! Every unit is either an atom, a composite of a fixed number of atoms of
//! another unit, or a function of date (its size depends on the date it is
//! anchored to, like "the month containing 2025-02-10"). Units are identified
//! by name; a unit anchored to a date compares equal to its unanchored form.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeUnitError {
    #[error("time unit '{0}' is not registered")]
    UnknownUnit(String),
    #[error("time unit '{0}' is already registered")]
    DuplicateUnit(String),
    #[error("time unit '{unit}' is not constructed from '{other}'")]
    Unrelated { unit: String, other: String },
    #[error("time unit '{0}' depends on a date; bind it to a date before counting atoms")]
    RequiresDate(String),
    #[error("time unit '{0}' has no date frame and cannot be walked")]
    NotFrameable(String),
}

/// Calendar-aligned frame used to walk the boundaries of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFrame {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl DateFrame {
    /// First day of the frame containing `date`. Weeks start on Monday.
    pub fn start_of(self, date: NaiveDate) -> NaiveDate {
        match self {
            DateFrame::Day => date,
            DateFrame::Week => {
                date - Duration::days(date.weekday().num_days_from_monday() as i64)
            }
            DateFrame::Month => date - Duration::days(date.day0() as i64),
            DateFrame::Quarter => {
                let mut start = DateFrame::Month.start_of(date);
                for _ in 0..(date.month0() % 3) {
                    start = DateFrame::Month.start_of(start - Duration::days(1));
                }
                start
            }
            DateFrame::Year => date - Duration::days(date.ordinal0() as i64),
        }
    }

    /// First day of the frame following the one containing `date`.
    pub fn next_start(self, date: NaiveDate) -> NaiveDate {
        let start = self.start_of(date);
        match self {
            DateFrame::Day => start + Duration::days(1),
            DateFrame::Week => start + Duration::days(7),
            DateFrame::Month => DateFrame::Month.start_of(start + Duration::days(32)),
            DateFrame::Quarter => DateFrame::Quarter.start_of(start + Duration::days(92)),
            DateFrame::Year => DateFrame::Year.start_of(start + Duration::days(366)),
        }
    }
}

/// A time unit as seen by callers.
///
/// `Fixed` names a registered unit. `BoundToDate` is the same unit anchored
/// to a context date, which function-of-date units need before they can
/// report an atom count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Fixed(String),
    BoundToDate(String, NaiveDate),
}

impl TimeUnit {
    pub fn name(&self) -> &str {
        match self {
            TimeUnit::Fixed(name) | TimeUnit::BoundToDate(name, _) => name,
        }
    }

    pub fn context_date(&self) -> Option<NaiveDate> {
        match self {
            TimeUnit::Fixed(_) => None,
            TimeUnit::BoundToDate(_, date) => Some(*date),
        }
    }

    pub fn bound_to(&self, date: NaiveDate) -> TimeUnit {
        TimeUnit::BoundToDate(self.name().to_string(), date)
    }
}

impl PartialEq for TimeUnit {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for TimeUnit {}

impl Hash for TimeUnit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeUnit::Fixed(name) => write!(f, "{name}"),
            TimeUnit::BoundToDate(name, date) => write!(f, "{name}@{date}"),
        }
    }
}

#[derive(Debug, Clone)]
enum UnitDefinition {
    Atom {
        frame: Option<DateFrame>,
    },
    Composite {
        atom: String,
        count: f64,
        frame: Option<DateFrame>,
    },
    FunctionOfDate {
        base: String,
        frame: DateFrame,
    },
}

/// Append-only registry of units and their compositions.
#[derive(Debug, Clone, Default)]
pub struct TimeUnitGraph {
    units: HashMap<String, UnitDefinition>,
}

impl TimeUnitGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_atom_unit(&mut self, name: &str) -> Result<TimeUnit, TimeUnitError> {
        self.register(name, UnitDefinition::Atom { frame: None })
    }

    /// Registers `name` as `atom_count` units of `atom_unit`, which must
    /// already be registered.
    pub fn create_composite(
        &mut self,
        name: &str,
        atom_unit: &TimeUnit,
        atom_count: f64,
    ) -> Result<TimeUnit, TimeUnitError> {
        self.require(atom_unit.name())?;
        self.register(
            name,
            UnitDefinition::Composite {
                atom: atom_unit.name().to_string(),
                count: atom_count,
                frame: None,
            },
        )
    }

    /// Registers a unit whose size is the number of `base` frames inside the
    /// `frame` containing a context date.
    pub fn create_function_of_date(
        &mut self,
        name: &str,
        base: &TimeUnit,
        frame: DateFrame,
    ) -> Result<TimeUnit, TimeUnitError> {
        self.require(base.name())?;
        self.register(
            name,
            UnitDefinition::FunctionOfDate {
                base: base.name().to_string(),
                frame,
            },
        )
    }

    /// Attaches a date frame to an atom or composite unit so that
    /// function-of-date units built on it can walk its boundaries.
    pub fn set_frame(&mut self, unit: &TimeUnit, new_frame: DateFrame) -> Result<(), TimeUnitError> {
        match self.units.get_mut(unit.name()) {
            Some(UnitDefinition::Atom { frame }) | Some(UnitDefinition::Composite { frame, .. }) => {
                *frame = Some(new_frame);
                Ok(())
            }
            Some(UnitDefinition::FunctionOfDate { .. }) => Ok(()),
            None => Err(TimeUnitError::UnknownUnit(unit.name().to_string())),
        }
    }

    pub fn find(&self, name: &str) -> Option<TimeUnit> {
        self.units
            .contains_key(name)
            .then(|| TimeUnit::Fixed(name.to_string()))
    }

    pub fn contains(&self, unit: &TimeUnit) -> bool {
        self.units.contains_key(unit.name())
    }

    /// True iff a composition path leads from `unit` down to `other`.
    pub fn is_constructed_from(&self, unit: &TimeUnit, other: &TimeUnit) -> bool {
        let mut current = unit.name();
        loop {
            if current == other.name() {
                return true;
            }
            match self.units.get(current) {
                Some(UnitDefinition::Composite { atom, .. }) => current = atom,
                Some(UnitDefinition::FunctionOfDate { base, .. }) => current = base,
                Some(UnitDefinition::Atom { .. }) | None => return false,
            }
        }
    }

    /// Number of `other` units in one `unit`, or `None` when there is no
    /// composition path or the count depends on an absent date.
    pub fn composition(&self, unit: &TimeUnit, other: &TimeUnit) -> Option<f64> {
        self.atom_count(unit, other).ok()
    }

    pub fn atom_count(&self, unit: &TimeUnit, other: &TimeUnit) -> Result<f64, TimeUnitError> {
        if !self.is_constructed_from(unit, other) {
            return Err(TimeUnitError::Unrelated {
                unit: unit.name().to_string(),
                other: other.name().to_string(),
            });
        }
        self.count_towards(unit.name(), unit.context_date(), other.name())
    }

    fn count_towards(
        &self,
        name: &str,
        date: Option<NaiveDate>,
        target: &str,
    ) -> Result<f64, TimeUnitError> {
        if name == target {
            return Ok(1.0);
        }
        match self.require(name)? {
            UnitDefinition::Atom { .. } => Err(TimeUnitError::Unrelated {
                unit: name.to_string(),
                other: target.to_string(),
            }),
            UnitDefinition::Composite { atom, count, .. } => {
                Ok(count * self.count_towards(atom, date, target)?)
            }
            UnitDefinition::FunctionOfDate { base, frame } => {
                let date = date.ok_or_else(|| TimeUnitError::RequiresDate(name.to_string()))?;
                let base_frame = self.frame_of(base)?;
                let end = frame.next_start(date);
                let mut cursor = frame.start_of(date);
                let mut total = 0.0;
                while cursor < end {
                    total += self.count_towards(base, Some(cursor), target)?;
                    cursor = base_frame.next_start(cursor);
                }
                Ok(total)
            }
        }
    }

    fn frame_of(&self, name: &str) -> Result<DateFrame, TimeUnitError> {
        match self.require(name)? {
            UnitDefinition::Atom { frame: Some(frame) }
            | UnitDefinition::Composite {
                frame: Some(frame), ..
            }
            | UnitDefinition::FunctionOfDate { frame, .. } => Ok(*frame),
            _ => Err(TimeUnitError::NotFrameable(name.to_string())),
        }
    }

    fn require(&self, name: &str) -> Result<&UnitDefinition, TimeUnitError> {
        self.units
            .get(name)
            .ok_or_else(|| TimeUnitError::UnknownUnit(name.to_string()))
    }

    fn register(&mut self, name: &str, definition: UnitDefinition) -> Result<TimeUnit, TimeUnitError> {
        if self.units.contains_key(name) {
            return Err(TimeUnitError::DuplicateUnit(name.to_string()));
        }
        self.units.insert(name.to_string(), definition);
        Ok(TimeUnit::Fixed(name.to_string()))
    }
}

/// The Gregorian unit set used by schedules: day is the atom.
#[derive(Debug, Clone)]
pub struct TimeUnitStack {
    graph: TimeUnitGraph,
    day: TimeUnit,
    week: TimeUnit,
    month: TimeUnit,
    quarter: TimeUnit,
    year: TimeUnit,
}

impl Default for TimeUnitStack {
    fn default() -> Self {
        Self::gregorian()
    }
}

impl TimeUnitStack {
    /// Builds day/week/month/quarter/year.
    ///
    /// Panics if the built-in graph is malformed; that is a programming
    /// error, not something a caller can recover from.
    pub fn gregorian() -> Self {
        Self::build_gregorian()
            .unwrap_or_else(|err| panic!("invalid built-in time unit graph: {err}"))
    }

    fn build_gregorian() -> Result<Self, TimeUnitError> {
        let mut graph = TimeUnitGraph::new();
        let day = graph.create_atom_unit("day")?;
        graph.set_frame(&day, DateFrame::Day)?;
        let week = graph.create_composite("week", &day, 7.0)?;
        graph.set_frame(&week, DateFrame::Week)?;
        let month = graph.create_function_of_date("month", &day, DateFrame::Month)?;
        let quarter = graph.create_function_of_date("quarter", &month, DateFrame::Quarter)?;
        let year = graph.create_function_of_date("year", &day, DateFrame::Year)?;
        Ok(Self {
            graph,
            day,
            week,
            month,
            quarter,
            year,
        })
    }

    pub fn graph(&self) -> &TimeUnitGraph {
        &self.graph
    }

    pub fn day(&self) -> &TimeUnit {
        &self.day
    }

    pub fn week(&self) -> &TimeUnit {
        &self.week
    }

    pub fn month(&self) -> &TimeUnit {
        &self.month
    }

    pub fn quarter(&self) -> &TimeUnit {
        &self.quarter
    }

    pub fn year(&self) -> &TimeUnit {
        &self.year
    }

    /// Resolves a unit by full name or by the short codes `d` and `w`.
    pub fn find_unit(&self, code: &str) -> Option<TimeUnit> {
        match code.trim().to_ascii_lowercase().as_str() {
            "d" => Some(self.day.clone()),
            "w" => Some(self.week.clone()),
            other => self.graph.find(other),
        }
    }

    /// Number of days in `length` units of `unit`, anchoring date-dependent
    /// units at `anchor`.
    pub fn days_in(&self, length: f64, unit: &TimeUnit, anchor: NaiveDate) -> Result<f64, TimeUnitError> {
        let bound = match unit {
            TimeUnit::Fixed(_) => unit.bound_to(anchor),
            TimeUnit::BoundToDate(..) => unit.clone(),
        };
        Ok(length * self.graph.atom_count(&bound, &self.day)?)
    }
}

/// An immutable length expressed in some unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeDuration {
    length: f64,
    unit: TimeUnit,
}

impl TimeDuration {
    pub fn new(length: f64, unit: TimeUnit) -> Self {
        Self { length, unit }
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn unit(&self) -> &TimeUnit {
        &self.unit
    }

    pub fn is_zero(&self) -> bool {
        self.length == 0.0
    }

    pub fn reverse(&self) -> Self {
        Self::new(-self.length, self.unit.clone())
    }

    /// Re-expresses this duration in `target`; the two units must be
    /// constructible from one another.
    pub fn convert_to(&self, graph: &TimeUnitGraph, target: &TimeUnit) -> Result<Self, TimeUnitError> {
        if graph.is_constructed_from(&self.unit, target) {
            let ratio = graph.atom_count(&self.unit, target)?;
            return Ok(Self::new(self.length * ratio, target.clone()));
        }
        if graph.is_constructed_from(target, &self.unit) {
            let ratio = graph.atom_count(target, &self.unit)?;
            return Ok(Self::new(self.length / ratio, target.clone()));
        }
        Err(TimeUnitError::Unrelated {
            unit: self.unit.name().to_string(),
            other: target.name().to_string(),
        })
    }
}

impl fmt::Display for TimeDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.length, self.unit.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn quarter_frames_align_to_calendar_quarters() {
        assert_eq!(DateFrame::Quarter.start_of(d(2025, 5, 17)), d(2025, 4, 1));
        assert_eq!(DateFrame::Quarter.next_start(d(2025, 5, 17)), d(2025, 7, 1));
        assert_eq!(DateFrame::Quarter.next_start(d(2025, 11, 30)), d(2026, 1, 1));
    }

    #[test]
    fn week_frame_starts_on_monday() {
        // 2025-01-08 is a Wednesday
        assert_eq!(DateFrame::Week.start_of(d(2025, 1, 8)), d(2025, 1, 6));
        assert_eq!(DateFrame::Week.next_start(d(2025, 1, 8)), d(2025, 1, 13));
    }

    #[test]
    fn month_and_year_frames_handle_leap_years() {
        assert_eq!(DateFrame::Month.next_start(d(2024, 2, 10)), d(2024, 3, 1));
        assert_eq!(DateFrame::Month.next_start(d(2024, 12, 31)), d(2025, 1, 1));
        assert_eq!(DateFrame::Year.next_start(d(2024, 12, 31)), d(2025, 1, 1));
    }

    #[test]
    fn composite_path_multiplies_counts() {
        let mut graph = TimeUnitGraph::new();
        let hour = graph.create_atom_unit("hour").unwrap();
        let shift = graph.create_composite("shift", &hour, 8.0).unwrap();
        let rota = graph.create_composite("rota", &shift, 2.5).unwrap();
        assert_eq!(graph.atom_count(&rota, &hour).unwrap(), 20.0);
    }
}
