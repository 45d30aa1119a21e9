use std::cmp::Reverse;
use std::collections::BTreeSet;

use crate::calculations::working_units::WorkingUnitCounter;
use crate::calendar::WorkCalendar;
use crate::report::ScheduleChange;
use crate::task::{TaskArena, TaskBounds, TaskId};
use crate::time_unit::{TimeDuration, TimeUnit};

/// Recomputes summary tasks from their children, deepest first: bounds
/// become the envelope of the children, duration the working days inside
/// it, completion the children's average weighted by working days.
pub struct AdjustTaskBounds<'a> {
    tasks: &'a mut TaskArena,
    calendar: &'a WorkCalendar,
    counter: &'a WorkingUnitCounter,
    day: &'a TimeUnit,
}

impl<'a> AdjustTaskBounds<'a> {
    pub fn new(
        tasks: &'a mut TaskArena,
        calendar: &'a WorkCalendar,
        counter: &'a WorkingUnitCounter,
        day: &'a TimeUnit,
    ) -> Self {
        Self {
            tasks,
            calendar,
            counter,
            day,
        }
    }

    /// Walks up from the parents of `modified`. Returns summaries whose
    /// bounds changed.
    pub fn execute<I>(mut self, modified: I) -> Vec<ScheduleChange>
    where
        I: IntoIterator<Item = TaskId>,
    {
        let mut pending: BTreeSet<(Reverse<usize>, TaskId)> = BTreeSet::new();
        for id in modified {
            if let Some(parent) = self.tasks.parent_of(id) {
                pending.insert((Reverse(self.tasks.depth(parent)), parent));
            }
        }
        self.drain(pending)
    }

    /// Starts from `summaries` themselves, e.g. a parent that just lost a
    /// child.
    pub fn execute_summaries<I>(mut self, summaries: I) -> Vec<ScheduleChange>
    where
        I: IntoIterator<Item = TaskId>,
    {
        let pending = summaries
            .into_iter()
            .filter(|id| self.tasks.contains(*id))
            .map(|id| (Reverse(self.tasks.depth(id)), id))
            .collect();
        self.drain(pending)
    }

    /// Recomputes every summary task in the schedule.
    pub fn execute_all(mut self) -> Vec<ScheduleChange> {
        let pending: BTreeSet<(Reverse<usize>, TaskId)> = self
            .tasks
            .ids()
            .into_iter()
            .filter(|id| self.tasks.is_summary(*id))
            .map(|id| (Reverse(self.tasks.depth(id)), id))
            .collect();
        self.drain(pending)
    }

    fn drain(&mut self, mut pending: BTreeSet<(Reverse<usize>, TaskId)>) -> Vec<ScheduleChange> {
        let mut changes = Vec::new();
        while let Some((_, id)) = pending.pop_first() {
            let (change, completion_changed) = self.recompute(id);
            let changed = change.is_some();
            changes.extend(change);
            if changed || completion_changed {
                if let Some(parent) = self.tasks.parent_of(id) {
                    pending.insert((Reverse(self.tasks.depth(parent)), parent));
                }
            }
        }
        changes
    }

    fn recompute(&mut self, id: TaskId) -> (Option<ScheduleChange>, bool) {
        let children: Vec<(TaskBounds, i64, u8)> = self
            .tasks
            .children_of(id)
            .iter()
            .filter_map(|child| self.tasks.get(*child))
            .map(|child| (child.bounds(), child.working_days, child.completion))
            .collect();
        let (Some(start), Some(end)) = (
            children.iter().map(|(bounds, _, _)| bounds.start).min(),
            children.iter().map(|(bounds, _, _)| bounds.end).max(),
        ) else {
            return (None, false);
        };

        let weight_total: i64 = children.iter().map(|(_, days, _)| (*days).max(1)).sum();
        let weighted: i64 = children
            .iter()
            .map(|(_, days, completion)| (*days).max(1) * i64::from(*completion))
            .sum();
        let completion = ((weighted as f64 / weight_total as f64).round() as i64).clamp(0, 100) as u8;
        let working_days = self.counter.working_days(self.calendar, start, end).unwrap_or(0);

        let Some(task) = self.tasks.get_mut(id) else {
            return (None, false);
        };
        let old = task.bounds();
        let completion_changed = task.completion != completion;
        task.start = start;
        task.end = end;
        task.working_days = working_days;
        task.duration = TimeDuration::new(working_days as f64, self.day.clone());
        task.completion = completion;
        task.milestone = false;

        let new = task.bounds();
        let change = (old != new).then_some(ScheduleChange { task: id, old, new });
        (change, completion_changed)
    }
}
