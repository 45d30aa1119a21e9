pub mod adjust_bounds;
pub mod critical_path;
pub mod recalculate;
pub mod shift_tree;
pub mod working_units;

use chrono::NaiveDate;

use crate::calendar::WorkCalendar;
use crate::dependency::ScheduledSpan;
use crate::task::Task;

pub(crate) fn span_of(task: &Task) -> ScheduledSpan {
    ScheduledSpan {
        start: task.start,
        end: task.end,
        working_days: task.working_days,
        milestone: task.milestone,
    }
}

/// Exclusive end of a task starting at `start`.
pub(crate) fn end_for(
    calendar: &WorkCalendar,
    start: NaiveDate,
    working_days: i64,
    milestone: bool,
) -> Option<NaiveDate> {
    if milestone {
        Some(start)
    } else {
        calendar.advance(start, working_days)
    }
}
