use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::calendar::{MoveDirection, WorkCalendar};
use crate::task::TaskId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyId(pub u32);

impl fmt::Display for DependencyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    #[default]
    FinishStart,
    StartStart,
    FinishFinish,
    StartFinish,
}

impl ConstraintKind {
    pub fn code(self) -> &'static str {
        match self {
            ConstraintKind::FinishStart => "FS",
            ConstraintKind::StartStart => "SS",
            ConstraintKind::FinishFinish => "FF",
            ConstraintKind::StartFinish => "SF",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "FS" => Some(ConstraintKind::FinishStart),
            "SS" => Some(ConstraintKind::StartStart),
            "FF" => Some(ConstraintKind::FinishFinish),
            "SF" => Some(ConstraintKind::StartFinish),
            _ => None,
        }
    }
}

/// Strict edges pin the dependant exactly to the boundary; rubber edges
/// only push it later.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hardness {
    #[default]
    Strict,
    Rubber,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variation {
    StartLater,
    StartEarlier,
    NoVariation,
}

/// Constraint kind plus a signed lag in working days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Constraint {
    pub kind: ConstraintKind,
    #[serde(default)]
    pub lag: i64,
}

impl Constraint {
    pub fn new(kind: ConstraintKind, lag: i64) -> Self {
        Self { kind, lag }
    }

    pub fn finish_start() -> Self {
        Self::new(ConstraintKind::FinishStart, 0)
    }

    /// Earliest start the dependant can take given the dependee's span.
    /// `None` when the calendar has no working time around the boundary.
    pub fn acceptable_start(
        &self,
        dependee: &ScheduledSpan,
        dependant_working_days: i64,
        calendar: &WorkCalendar,
    ) -> Option<NaiveDate> {
        match self.kind {
            ConstraintKind::FinishStart => start_point(calendar, dependee.end, self.lag),
            ConstraintKind::StartStart => start_point(calendar, dependee.start, self.lag),
            ConstraintKind::FinishFinish => {
                let end = end_point(calendar, dependee.end, self.lag)?;
                start_for_end(calendar, end, dependant_working_days)
            }
            ConstraintKind::StartFinish => {
                let end = start_point(calendar, dependee.start, self.lag)?;
                start_for_end(calendar, end, dependant_working_days)
            }
        }
    }

    /// Date the constraint compares against on the dependant's side: a start
    /// for FS/SS, an end for FF/SF.
    pub fn boundary(&self, dependee: &ScheduledSpan, calendar: &WorkCalendar) -> Option<NaiveDate> {
        match self.kind {
            ConstraintKind::FinishStart => start_point(calendar, dependee.end, self.lag),
            ConstraintKind::StartStart => start_point(calendar, dependee.start, self.lag),
            ConstraintKind::FinishFinish => end_point(calendar, dependee.end, self.lag),
            ConstraintKind::StartFinish => start_point(calendar, dependee.start, self.lag),
        }
    }

    /// Latest finish the dependee may take without pushing a dependant whose
    /// latest span is `dependant`.
    pub fn latest_dependee_finish(
        &self,
        dependant: &ScheduledSpan,
        dependee_working_days: i64,
        calendar: &WorkCalendar,
    ) -> Option<NaiveDate> {
        match self.kind {
            ConstraintKind::FinishStart => calendar.shift_date(dependant.start, -self.lag),
            ConstraintKind::StartStart => {
                let latest_start = calendar.shift_date(dependant.start, -self.lag)?;
                calendar.advance(latest_start, dependee_working_days)
            }
            ConstraintKind::FinishFinish => end_point(calendar, dependant.end, -self.lag),
            ConstraintKind::StartFinish => {
                let latest_start = calendar.shift_date(dependant.end, -self.lag)?;
                calendar.advance(latest_start, dependee_working_days)
            }
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.lag {
            0 => write!(f, "{}", self.kind.code()),
            lag if lag > 0 => write!(f, "{}+{lag}", self.kind.code()),
            lag => write!(f, "{}{lag}", self.kind.code()),
        }
    }
}

fn start_point(calendar: &WorkCalendar, date: NaiveDate, lag: i64) -> Option<NaiveDate> {
    let anchor = calendar.find_closest_working_day(date, MoveDirection::Forward)?;
    calendar.shift_date(anchor, lag)
}

/// Moves an exclusive end by `lag` working days, keeping it exclusive.
fn end_point(calendar: &WorkCalendar, end: NaiveDate, lag: i64) -> Option<NaiveDate> {
    if lag == 0 {
        return Some(end);
    }
    let last = calendar.retreat(end, 1)?;
    calendar.shift_date(last, lag)?.succ_opt()
}

fn start_for_end(calendar: &WorkCalendar, end: NaiveDate, working_days: i64) -> Option<NaiveDate> {
    if working_days == 0 {
        Some(end)
    } else {
        calendar.retreat(end, working_days)
    }
}

/// The parts of a task a binding looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub working_days: i64,
    pub milestone: bool,
}

impl ScheduledSpan {
    fn has_activity(&self, calendar: &WorkCalendar) -> bool {
        if self.milestone || self.start == self.end {
            return true;
        }
        calendar
            .activities(self.start, self.end)
            .iter()
            .any(|activity| activity.working)
    }
}

/// Outcome of checking one edge against the dependant's current span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collision {
    /// Dependant-side date the edge compares against.
    pub boundary: NaiveDate,
    /// Start the dependant would need for the edge to be satisfied.
    pub acceptable_start: NaiveDate,
    pub active: bool,
    pub variation: Variation,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("binding {dependee} -> {dependant} is unavailable: {reason}")]
pub struct BindingUnavailable {
    pub dependant: TaskId,
    pub dependee: TaskId,
    pub reason: String,
}

/// A directed edge: `dependee` constrains `dependant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDependency {
    pub id: DependencyId,
    pub dependant: TaskId,
    pub dependee: TaskId,
    pub constraint: Constraint,
    pub hardness: Hardness,
}

impl TaskDependency {
    pub fn collision(
        &self,
        dependee: &ScheduledSpan,
        dependant: &ScheduledSpan,
        calendar: &WorkCalendar,
    ) -> Result<Collision, BindingUnavailable> {
        if !dependee.has_activity(calendar) {
            return Err(self.unavailable("dependee has no working days in its span"));
        }
        if !dependant.has_activity(calendar) {
            return Err(self.unavailable("dependant has no working days in its span"));
        }
        let no_working_time = || self.unavailable("no working day near the boundary");
        let boundary = self
            .constraint
            .boundary(dependee, calendar)
            .ok_or_else(no_working_time)?;
        let acceptable_start = self
            .constraint
            .acceptable_start(dependee, dependant.working_days, calendar)
            .ok_or_else(no_working_time)?;

        let variation = if acceptable_start > dependant.start {
            Variation::StartLater
        } else if acceptable_start < dependant.start {
            Variation::StartEarlier
        } else {
            Variation::NoVariation
        };
        let active = match self.hardness {
            Hardness::Strict => variation != Variation::NoVariation,
            Hardness::Rubber => variation == Variation::StartLater,
        };
        Ok(Collision {
            boundary,
            acceptable_start,
            active,
            variation,
        })
    }

    fn unavailable(&self, reason: &str) -> BindingUnavailable {
        BindingUnavailable {
            dependant: self.dependant,
            dependee: self.dependee,
            reason: reason.to_string(),
        }
    }
}

/// Every dependency in a schedule, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct DependencyTable {
    edges: BTreeMap<DependencyId, TaskDependency>,
    next_id: u32,
}

impl DependencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(
        &mut self,
        dependant: TaskId,
        dependee: TaskId,
        constraint: Constraint,
        hardness: Hardness,
    ) -> DependencyId {
        let id = DependencyId(self.next_id);
        self.next_id += 1;
        self.edges.insert(
            id,
            TaskDependency {
                id,
                dependant,
                dependee,
                constraint,
                hardness,
            },
        );
        id
    }

    pub(crate) fn remove(&mut self, id: DependencyId) -> Option<TaskDependency> {
        self.edges.remove(&id)
    }

    /// Removes every edge touching one of `tasks`.
    pub(crate) fn remove_incident(&mut self, tasks: &[TaskId]) -> Vec<TaskDependency> {
        let doomed: Vec<DependencyId> = self
            .edges
            .values()
            .filter(|dep| tasks.contains(&dep.dependant) || tasks.contains(&dep.dependee))
            .map(|dep| dep.id)
            .collect();
        doomed.into_iter().filter_map(|id| self.edges.remove(&id)).collect()
    }

    pub fn get(&self, id: DependencyId) -> Option<&TaskDependency> {
        self.edges.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: DependencyId) -> Option<&mut TaskDependency> {
        self.edges.get_mut(&id)
    }

    pub fn find(&self, dependant: TaskId, dependee: TaskId) -> Option<&TaskDependency> {
        self.edges
            .values()
            .find(|dep| dep.dependant == dependant && dep.dependee == dependee)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskDependency> + '_ {
        self.edges.values()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
