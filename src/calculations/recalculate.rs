use chrono::NaiveDate;
use std::collections::{HashSet, VecDeque};
use tracing::{debug, warn};

use crate::calculations::shift_tree::{apply_moves, plan_translation};
use crate::calculations::working_units::WorkingUnitCounter;
use crate::calculations::{end_for, span_of};
use crate::calendar::{MoveDirection, WorkCalendar};
use crate::dependency::{DependencyTable, Hardness};
use crate::graph::ScheduleDag;
use crate::report::{ScheduleChange, ScheduleWarning};
use crate::task::{TaskArena, TaskBounds, TaskId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecalculateOutcome {
    pub changes: Vec<ScheduleChange>,
    pub warnings: Vec<ScheduleWarning>,
    pub iterations: usize,
    pub converged: bool,
}

impl Default for RecalculateOutcome {
    fn default() -> Self {
        Self {
            changes: Vec::new(),
            warnings: Vec::new(),
            iterations: 0,
            converged: true,
        }
    }
}

/// Pushes dependants forward (or, across strict edges, back) until every
/// dependency reachable from the seeds is satisfied.
///
/// Each popped task re-evaluates all of its incoming edges. Its dependants
/// are queued when it moved or when it is one of the seeds. A summary
/// pushed later moves only the leaves that start too early; a summary
/// pulled earlier translates its whole subtree.
pub struct RecalculateSchedule<'a> {
    tasks: &'a mut TaskArena,
    dependencies: &'a DependencyTable,
    dag: &'a ScheduleDag,
    calendar: &'a WorkCalendar,
    counter: &'a WorkingUnitCounter,
    iteration_cap: usize,
}

impl<'a> RecalculateSchedule<'a> {
    pub fn new(
        tasks: &'a mut TaskArena,
        dependencies: &'a DependencyTable,
        dag: &'a ScheduleDag,
        calendar: &'a WorkCalendar,
        counter: &'a WorkingUnitCounter,
        iteration_cap: usize,
    ) -> Self {
        Self {
            tasks,
            dependencies,
            dag,
            calendar,
            counter,
            iteration_cap,
        }
    }

    pub fn execute<I>(mut self, seeds: I) -> RecalculateOutcome
    where
        I: IntoIterator<Item = TaskId>,
    {
        let mut outcome = RecalculateOutcome::default();
        let mut queue: VecDeque<TaskId> = VecDeque::new();
        let mut queued: HashSet<TaskId> = HashSet::new();
        let mut unvisited_seeds: HashSet<TaskId> = HashSet::new();
        for seed in seeds {
            if self.tasks.contains(seed) && queued.insert(seed) {
                queue.push_back(seed);
                unvisited_seeds.insert(seed);
            }
        }

        while let Some(task_id) = queue.pop_front() {
            queued.remove(&task_id);
            if outcome.iterations >= self.iteration_cap {
                warn!(
                    iterations = outcome.iterations,
                    pending = queue.len() + 1,
                    "recalculation hit its iteration cap"
                );
                outcome.converged = false;
                outcome.warnings.push(ScheduleWarning::NotConverged {
                    iterations: outcome.iterations,
                });
                break;
            }
            outcome.iterations += 1;

            let mut sources = self.fulfil_constraints(task_id, &mut outcome);
            let was_seed = unvisited_seeds.remove(&task_id);
            if sources.is_empty() {
                if !was_seed {
                    continue;
                }
                sources.push(task_id);
            }

            for source in sources {
                for dep_id in self.dag.dependencies_as_dependee(source) {
                    if let Some(dep) = self.dependencies.get(dep_id) {
                        if queued.insert(dep.dependant) {
                            queue.push_back(dep.dependant);
                        }
                    }
                }
            }
        }

        debug!(
            iterations = outcome.iterations,
            moved = outcome.changes.len(),
            converged = outcome.converged,
            "recalculation finished"
        );
        outcome
    }

    /// Moves `task_id` to satisfy its incoming edges and earliest-begin
    /// date. Returns every task that moved.
    fn fulfil_constraints(&mut self, task_id: TaskId, outcome: &mut RecalculateOutcome) -> Vec<TaskId> {
        let Some(task) = self.tasks.get(task_id) else {
            return Vec::new();
        };
        let dependant = span_of(task);

        let mut has_strict = false;
        let mut strict: Option<NaiveDate> = None;
        let mut rubber_any: Option<NaiveDate> = None;
        let mut rubber_active: Option<NaiveDate> = None;
        for dep_id in self.dag.dependencies_as_dependant(task_id) {
            let Some(dep) = self.dependencies.get(dep_id) else {
                continue;
            };
            let Some(dependee) = self.tasks.get(dep.dependee) else {
                continue;
            };
            match dep.collision(&span_of(dependee), &dependant, self.calendar) {
                Ok(collision) => match dep.hardness {
                    Hardness::Strict => {
                        has_strict = true;
                        strict = strict.max(Some(collision.acceptable_start));
                    }
                    Hardness::Rubber => {
                        rubber_any = rubber_any.max(Some(collision.acceptable_start));
                        if collision.active {
                            rubber_active = rubber_active.max(Some(collision.acceptable_start));
                        }
                    }
                },
                Err(unavailable) => {
                    warn!(
                        dependant = %dep.dependant,
                        dependee = %dep.dependee,
                        reason = %unavailable.reason,
                        "skipping dependency"
                    );
                    outcome
                        .warnings
                        .push(ScheduleWarning::BindingUnavailable(unavailable));
                }
            }
        }

        let mut target = if has_strict {
            strict.max(rubber_any)
        } else {
            rubber_active
        };
        if let Some(earliest) = task.earliest_begin {
            if target.unwrap_or(task.start) < earliest {
                target = Some(earliest);
            }
        }
        let Some(mut target) = target else {
            return Vec::new();
        };
        if !task.milestone {
            match self
                .calendar
                .find_closest_working_day(target, MoveDirection::Forward)
            {
                Some(working) => target = working,
                None => {
                    outcome
                        .warnings
                        .push(ScheduleWarning::NoWorkingTime { task: task_id });
                    return Vec::new();
                }
            }
        }
        if target == task.start {
            return Vec::new();
        }
        self.move_to(task_id, target, outcome)
    }

    fn move_to(&mut self, task_id: TaskId, target: NaiveDate, outcome: &mut RecalculateOutcome) -> Vec<TaskId> {
        let Some(task) = self.tasks.get(task_id) else {
            return Vec::new();
        };

        let moves = if task.is_summary() && target > task.start {
            match self.clamp_leaves(task_id, target) {
                Some(moves) => moves,
                None => {
                    outcome
                        .warnings
                        .push(ScheduleWarning::NoWorkingTime { task: task_id });
                    return Vec::new();
                }
            }
        } else if task.is_summary() {
            let offset = self
                .counter
                .signed_working_days(self.calendar, task.start, target);
            if offset == 0 {
                return Vec::new();
            }
            match plan_translation(self.tasks, self.calendar, task_id, offset) {
                Ok(plan) => plan,
                Err(rejected) => {
                    warn!(task = %rejected.task, reason = %rejected.reason, "summary cannot follow its dependencies");
                    outcome
                        .warnings
                        .push(ScheduleWarning::NoWorkingTime { task: rejected.task });
                    return Vec::new();
                }
            }
        } else {
            match end_for(self.calendar, target, task.working_days, task.milestone) {
                Some(end) => vec![ScheduleChange {
                    task: task_id,
                    old: task.bounds(),
                    new: TaskBounds::new(target, end),
                }],
                None => {
                    outcome
                        .warnings
                        .push(ScheduleWarning::NoWorkingTime { task: task_id });
                    return Vec::new();
                }
            }
        };

        apply_moves(self.tasks, &moves);
        let moved = moves.iter().map(|change| change.task).collect();
        outcome.changes.extend(moves);
        moved
    }

    /// Pushes every leaf under `summary` that starts before `target` up to
    /// it. Leaves already past `target` stay where they are; the summary
    /// bounds follow on the next adjustment.
    fn clamp_leaves(&self, summary: TaskId, target: NaiveDate) -> Option<Vec<ScheduleChange>> {
        let mut moves = Vec::new();
        for leaf in self.tasks.leaves_under(summary) {
            let Some(task) = self.tasks.get(leaf) else {
                continue;
            };
            if task.start >= target {
                continue;
            }
            let end = end_for(self.calendar, target, task.working_days, task.milestone)?;
            moves.push(ScheduleChange {
                task: leaf,
                old: task.bounds(),
                new: TaskBounds::new(target, end),
            });
        }
        Some(moves)
    }
}
