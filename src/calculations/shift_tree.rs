use thiserror::Error;

use crate::calculations::end_for;
use crate::calendar::WorkCalendar;
use crate::report::ScheduleChange;
use crate::task::{TaskArena, TaskBounds, TaskId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("shift rejected at task {task}: {reason}")]
pub struct ShiftRejected {
    pub task: TaskId,
    pub reason: String,
}

/// Computes the bounds every task in the subtree rooted at `root` would
/// take if translated by `offset` working days, without touching anything.
pub fn plan_translation(
    tasks: &TaskArena,
    calendar: &WorkCalendar,
    root: TaskId,
    offset: i64,
) -> Result<Vec<ScheduleChange>, ShiftRejected> {
    let mut ids = vec![root];
    ids.extend(tasks.descendants(root));

    let mut plan = Vec::with_capacity(ids.len());
    for id in ids {
        let Some(task) = tasks.get(id) else {
            continue;
        };
        let rejected = |reason: &str| ShiftRejected {
            task: id,
            reason: reason.to_string(),
        };
        let start = calendar
            .shift_date(task.start, offset)
            .ok_or_else(|| rejected("no working day within reach"))?;
        let end = end_for(calendar, start, task.working_days, task.milestone)
            .ok_or_else(|| rejected("not enough working days after the new start"))?;
        if let Some(earliest) = task.earliest_begin {
            if start < earliest {
                return Err(rejected("new start precedes the earliest begin date"));
            }
        }
        plan.push(ScheduleChange {
            task: id,
            old: task.bounds(),
            new: TaskBounds::new(start, end),
        });
    }
    Ok(plan)
}

pub(crate) fn apply_moves(tasks: &mut TaskArena, moves: &[ScheduleChange]) {
    for change in moves {
        if let Some(task) = tasks.get_mut(change.task) {
            task.start = change.new.start;
            task.end = change.new.end;
        }
    }
}

/// Translates a task and everything below it as one unit. Either every
/// task moves or none does.
pub struct ShiftTaskTree<'a> {
    tasks: &'a mut TaskArena,
    calendar: &'a WorkCalendar,
}

impl<'a> ShiftTaskTree<'a> {
    pub fn new(tasks: &'a mut TaskArena, calendar: &'a WorkCalendar) -> Self {
        Self { tasks, calendar }
    }

    pub fn execute(self, root: TaskId, offset: i64) -> Result<Vec<ScheduleChange>, ShiftRejected> {
        let plan = plan_translation(self.tasks, self.calendar, root, offset)?;
        apply_moves(self.tasks, &plan);
        Ok(plan)
    }
}
