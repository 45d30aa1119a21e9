use chrono::{NaiveDate, TimeDelta, Weekday};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::iter;
use tracing::{debug, info, warn};

use crate::calculations::adjust_bounds::AdjustTaskBounds;
use crate::calculations::critical_path::{CriticalPath, CriticalPathAlgorithm};
use crate::calculations::end_for;
use crate::calculations::recalculate::RecalculateSchedule;
use crate::calculations::shift_tree::{ShiftTaskTree, plan_translation, apply_moves};
use crate::calculations::working_units::WorkingUnitCounter;
use crate::calendar::{
    CalendarActivity, CalendarEvent, DayMask, DayType, ImportMode, MoveDirection, WorkCalendar,
};
use crate::dependency::{Constraint, DependencyId, DependencyTable, Hardness, TaskDependency};
use crate::errors::ScheduleError;
use crate::events::{ScheduleEvent, ScheduleListener};
use crate::graph::{ScheduleDag, has_implicit_cycle};
use crate::metadata::{ScheduleMetadata, SchedulerOptions};
use crate::report::{MutationReport, ScheduleChange, ScheduleWarning};
use crate::task::{NewTask, Priority, Task, TaskArena, TaskBounds, TaskId};
use crate::time_unit::{TimeDuration, TimeUnit, TimeUnitError, TimeUnitStack};

/// A project schedule: tasks, their hierarchy, dependencies and the
/// calendar they are laid out on.
///
/// Every mutation validates first, then commits, then propagates
/// (dependency recalculation, summary bounds, critical path) and finally
/// notifies subscribers. A rejected mutation changes nothing.
pub struct Schedule {
    pub(crate) metadata: ScheduleMetadata,
    pub(crate) options: SchedulerOptions,
    pub(crate) units: TimeUnitStack,
    pub(crate) calendar: WorkCalendar,
    pub(crate) tasks: TaskArena,
    pub(crate) dependencies: DependencyTable,
    dag: ScheduleDag,
    counter: WorkingUnitCounter,
    critical_path: CriticalPath,
    listeners: Vec<ScheduleListener>,
    last_report: MutationReport,
}

impl fmt::Debug for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schedule")
            .field("metadata", &self.metadata)
            .field("tasks", &self.tasks.len())
            .field("dependencies", &self.dependencies.len())
            .field("calendar_revision", &self.calendar.revision())
            .finish()
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::new()
    }
}

impl Schedule {
    pub fn new() -> Self {
        Self::new_with_metadata(ScheduleMetadata::default())
    }

    pub fn new_with_metadata(metadata: ScheduleMetadata) -> Self {
        Self::with_parts(
            metadata,
            SchedulerOptions::default(),
            WorkCalendar::new(),
            TimeUnitStack::gregorian(),
        )
    }

    pub fn new_with_metadata_and_calendar(metadata: ScheduleMetadata, calendar: WorkCalendar) -> Self {
        Self::with_parts(
            metadata,
            SchedulerOptions::default(),
            calendar,
            TimeUnitStack::gregorian(),
        )
    }

    pub fn with_parts(
        metadata: ScheduleMetadata,
        options: SchedulerOptions,
        calendar: WorkCalendar,
        units: TimeUnitStack,
    ) -> Self {
        Self {
            metadata,
            options,
            units,
            calendar,
            tasks: TaskArena::new(),
            dependencies: DependencyTable::new(),
            dag: ScheduleDag::default(),
            counter: WorkingUnitCounter::new(),
            critical_path: CriticalPath::default(),
            listeners: Vec::new(),
            last_report: MutationReport::default(),
        }
    }

    // ----- queries -----

    pub fn metadata(&self) -> &ScheduleMetadata {
        &self.metadata
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    pub fn units(&self) -> &TimeUnitStack {
        &self.units
    }

    pub fn calendar(&self) -> &WorkCalendar {
        &self.calendar
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Tasks in hierarchy order.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> + '_ {
        self.tasks.iter()
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn task_arena(&self) -> &TaskArena {
        &self.tasks
    }

    pub fn dependency(&self, id: DependencyId) -> Option<&TaskDependency> {
        self.dependencies.get(id)
    }

    pub fn dependencies(&self) -> impl Iterator<Item = &TaskDependency> + '_ {
        self.dependencies.iter()
    }

    pub fn dependencies_as_dependant(&self, task: TaskId) -> Vec<&TaskDependency> {
        self.dag
            .dependencies_as_dependant(task)
            .into_iter()
            .filter_map(|id| self.dependencies.get(id))
            .collect()
    }

    pub fn dependencies_as_dependee(&self, task: TaskId) -> Vec<&TaskDependency> {
        self.dag
            .dependencies_as_dependee(task)
            .into_iter()
            .filter_map(|id| self.dependencies.get(id))
            .collect()
    }

    pub fn critical_path(&self) -> &CriticalPath {
        &self.critical_path
    }

    pub fn critical_tasks(&self) -> BTreeSet<TaskId> {
        self.critical_path.critical_tasks()
    }

    pub fn is_critical(&self, task: TaskId) -> bool {
        self.critical_path.is_critical(task)
    }

    /// Report of the most recent successful mutation.
    pub fn last_report(&self) -> &MutationReport {
        &self.last_report
    }

    pub fn day_mask(&self, date: NaiveDate) -> DayMask {
        self.calendar.day_mask(date)
    }

    pub fn event_at(&self, date: NaiveDate) -> Option<&CalendarEvent> {
        self.calendar.event_at(date)
    }

    /// Working and non-working runs inside a task's span.
    pub fn activities(&self, id: TaskId) -> Result<Vec<CalendarActivity>, ScheduleError> {
        let task = self.require(id)?;
        Ok(self.calendar.activities(task.start, task.end))
    }

    pub fn project_start(&self) -> Option<NaiveDate> {
        self.tasks.iter().map(|task| task.start).min()
    }

    pub fn project_end(&self) -> Option<NaiveDate> {
        self.tasks.iter().map(|task| task.end).max()
    }

    /// Working time in `[start, end)` expressed in `unit`.
    pub fn count_working(
        &self,
        unit: &TimeUnit,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TimeDuration, ScheduleError> {
        Ok(self.counter.count(&self.calendar, &self.units, unit, start, end)?)
    }

    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&ScheduleEvent) + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    // ----- metadata -----

    pub fn set_metadata(&mut self, metadata: ScheduleMetadata) {
        self.metadata = metadata;
    }

    pub fn set_project_name(&mut self, name: impl Into<String>) {
        self.metadata.project_name = name.into();
    }

    pub fn set_project_description(&mut self, description: impl Into<String>) {
        self.metadata.project_description = description.into();
    }

    pub fn set_project_start_date(&mut self, date: NaiveDate) {
        self.metadata.project_start_date = date;
    }

    pub fn set_options(&mut self, options: SchedulerOptions) {
        self.options = options;
    }

    // ----- tasks -----

    pub fn create_task(&mut self, new_task: NewTask) -> Result<TaskId, ScheduleError> {
        let id = self.tasks.next_id().ok_or(ScheduleError::TaskIdsExhausted)?;
        if let Some(parent) = new_task.parent {
            self.require(parent)?;
        }
        let requested = new_task.start.unwrap_or(self.metadata.project_start_date);
        let start = self.normalize_start(id, requested, new_task.milestone)?;
        let duration = if new_task.milestone {
            TimeDuration::new(0.0, self.units.day().clone())
        } else {
            new_task
                .duration
                .unwrap_or_else(|| TimeDuration::new(1.0, self.units.day().clone()))
        };
        let working_days = if new_task.milestone {
            0
        } else {
            self.working_days_for(id, &duration, start)?
        };
        let end = end_for(&self.calendar, start, working_days, new_task.milestone)
            .ok_or(ScheduleError::NoWorkingTime(id))?;

        self.tasks.insert(Task {
            id,
            name: new_task.name,
            notes: None,
            start,
            end,
            duration,
            working_days,
            completion: 0,
            milestone: new_task.milestone,
            priority: Priority::default(),
            parent: new_task.parent,
            children: Vec::new(),
            earliest_begin: None,
        });
        self.rebuild_index();
        debug!(task = %id, %start, %end, "task created");

        let mut report = MutationReport::default();
        self.propagate(vec![id], Vec::new(), &mut report);
        self.finish(report, Vec::new());
        Ok(id)
    }

    /// Deletes a task, its whole subtree and every dependency touching them.
    pub fn delete_task(&mut self, id: TaskId) -> Result<MutationReport, ScheduleError> {
        self.require(id)?;
        let parent = self.tasks.parent_of(id);
        let removed: Vec<TaskId> = self
            .tasks
            .remove_subtree(id)
            .into_iter()
            .map(|task| task.id)
            .collect();
        let removed_dependencies = self.dependencies.remove_incident(&removed);
        self.rebuild_index();
        info!(
            task = %id,
            tasks = removed.len(),
            dependencies = removed_dependencies.len(),
            "task deleted"
        );

        let seeds: Vec<TaskId> = removed_dependencies
            .iter()
            .map(|dep| dep.dependant)
            .filter(|task| self.tasks.contains(*task))
            .collect();
        let mut report = MutationReport::default();
        self.propagate(seeds, parent.into_iter().collect(), &mut report);
        let events = removed_dependencies
            .into_iter()
            .map(ScheduleEvent::DependencyRemoved)
            .collect();
        Ok(self.finish(report, events))
    }

    /// Moves a task (with its subtree) under `new_parent`, or to the top
    /// level when `None`.
    pub fn move_task(&mut self, id: TaskId, new_parent: Option<TaskId>) -> Result<MutationReport, ScheduleError> {
        self.require(id)?;
        if let Some(parent) = new_parent {
            self.require(parent)?;
            if parent == id || self.tasks.is_ancestor(id, parent) {
                return Err(ScheduleError::ContainmentCycle { task: id, parent });
            }
        }

        let mut preview = self.tasks.clone();
        preview.reparent(id, new_parent);
        for dep in self.dependencies.iter() {
            if preview.is_ancestor(dep.dependee, dep.dependant) || preview.is_ancestor(dep.dependant, dep.dependee) {
                return Err(ScheduleError::HierarchyConflict {
                    dependant: dep.dependant,
                    dependee: dep.dependee,
                });
            }
        }
        if has_implicit_cycle(&preview, self.edge_pairs()) {
            return Err(ScheduleError::DependencyCycle {
                dependant: id,
                dependee: new_parent.unwrap_or(id),
            });
        }

        let old_parent = self.tasks.parent_of(id);
        self.tasks = preview;
        self.rebuild_index();

        let mut report = MutationReport::default();
        self.propagate(vec![id], old_parent.into_iter().collect(), &mut report);
        Ok(self.finish(report, Vec::new()))
    }

    pub fn set_name(&mut self, id: TaskId, name: impl Into<String>) -> Result<(), ScheduleError> {
        self.require_mut(id)?.name = name.into();
        Ok(())
    }

    pub fn set_notes(&mut self, id: TaskId, notes: Option<String>) -> Result<(), ScheduleError> {
        self.require_mut(id)?.notes = notes;
        Ok(())
    }

    pub fn set_priority(&mut self, id: TaskId, priority: Priority) -> Result<(), ScheduleError> {
        self.require_mut(id)?.priority = priority;
        Ok(())
    }

    pub fn set_completion(&mut self, id: TaskId, value: u8) -> Result<MutationReport, ScheduleError> {
        if self.require(id)?.is_summary() {
            return Err(ScheduleError::DerivedBounds(id));
        }
        if value > 100 {
            return Err(ScheduleError::InvalidCompletion { task: id, value });
        }
        self.require_mut(id)?.completion = value;
        let mut report = MutationReport::default();
        self.propagate(Vec::new(), self.tasks.parent_of(id).into_iter().collect(), &mut report);
        Ok(self.finish(report, Vec::new()))
    }

    /// Moves a task so it starts on `date` (the next working day for
    /// ordinary tasks). Summaries translate their whole subtree.
    pub fn set_start(&mut self, id: TaskId, date: NaiveDate) -> Result<MutationReport, ScheduleError> {
        let task = self.require(id)?;
        let moves = if task.is_summary() {
            let target = self.normalize_start(id, date, false)?;
            let offset = self.counter.signed_working_days(&self.calendar, task.start, target);
            plan_translation(&self.tasks, &self.calendar, id, offset)?
        } else {
            let start = self.normalize_start(id, date, task.milestone)?;
            let end = end_for(&self.calendar, start, task.working_days, task.milestone)
                .ok_or(ScheduleError::NoWorkingTime(id))?;
            vec![ScheduleChange {
                task: id,
                old: task.bounds(),
                new: TaskBounds::new(start, end),
            }]
        };
        self.commit_moves(moves)
    }

    /// Sets the exclusive end of an ordinary task; the duration follows.
    pub fn set_end(&mut self, id: TaskId, date: NaiveDate) -> Result<MutationReport, ScheduleError> {
        let task = self.require(id)?;
        if task.is_summary() {
            return Err(ScheduleError::DerivedBounds(id));
        }
        if date < task.start {
            return Err(ScheduleError::InvalidDuration {
                task: id,
                reason: format!("end {date} precedes start {}", task.start),
            });
        }
        if task.milestone && date != task.start {
            return Err(ScheduleError::InvalidDuration {
                task: id,
                reason: "milestones have no duration".to_string(),
            });
        }
        let start = task.start;
        let working_days = self.counter.working_days(&self.calendar, start, date)?;
        let end = end_for(&self.calendar, start, working_days, task.milestone)
            .ok_or(ScheduleError::NoWorkingTime(id))?;
        let day = self.units.day().clone();
        self.set_leaf_span(id, end, working_days, TimeDuration::new(working_days as f64, day))
    }

    pub fn set_duration(&mut self, id: TaskId, duration: TimeDuration) -> Result<MutationReport, ScheduleError> {
        let task = self.require(id)?;
        if task.is_summary() {
            return Err(ScheduleError::DerivedBounds(id));
        }
        if task.milestone && !duration.is_zero() {
            return Err(ScheduleError::InvalidDuration {
                task: id,
                reason: "milestones have no duration".to_string(),
            });
        }
        let start = task.start;
        let milestone = task.milestone;
        let working_days = self.working_days_for(id, &duration, start)?;
        let end = end_for(&self.calendar, start, working_days, milestone)
            .ok_or(ScheduleError::NoWorkingTime(id))?;
        self.set_leaf_span(id, end, working_days, duration)
    }

    pub fn set_milestone(&mut self, id: TaskId, milestone: bool) -> Result<MutationReport, ScheduleError> {
        let task = self.require(id)?;
        if task.is_summary() {
            return Err(ScheduleError::DerivedBounds(id));
        }
        if task.milestone == milestone {
            return Ok(MutationReport::default());
        }
        let day = self.units.day().clone();
        let (start, working_days) = if milestone {
            (task.start, 0)
        } else {
            (self.normalize_start(id, task.start, false)?, task.working_days.max(1))
        };
        let end = end_for(&self.calendar, start, working_days, milestone)
            .ok_or(ScheduleError::NoWorkingTime(id))?;
        let old = task.bounds();

        let task = self.require_mut(id)?;
        task.milestone = milestone;
        task.start = start;
        task.end = end;
        task.working_days = working_days;
        task.duration = TimeDuration::new(working_days as f64, day);

        let mut report = MutationReport::default();
        report.record(ScheduleChange {
            task: id,
            old,
            new: TaskBounds::new(start, end),
        });
        self.propagate(vec![id], Vec::new(), &mut report);
        Ok(self.finish(report, Vec::new()))
    }

    /// Lower bound on the start; dependencies never pull the task earlier.
    pub fn set_earliest_begin(
        &mut self,
        id: TaskId,
        date: Option<NaiveDate>,
    ) -> Result<MutationReport, ScheduleError> {
        self.require_mut(id)?.earliest_begin = date;
        let mut report = MutationReport::default();
        self.propagate(vec![id], Vec::new(), &mut report);
        Ok(self.finish(report, Vec::new()))
    }

    /// Translates a task and its subtree by `offset`, counted in working
    /// time. Rejected as a whole if any task cannot land.
    pub fn shift_task(&mut self, id: TaskId, offset: &TimeDuration) -> Result<MutationReport, ScheduleError> {
        let task = self.require(id)?;
        let days = self.units.days_in(offset.length(), offset.unit(), task.start)?;
        calendar_span_end(id, task.start, days)?;
        let working_days = if offset.unit() == self.units.day() {
            days.round() as i64
        } else {
            let span_end = calendar_span_end(id, task.start, days.abs())?;
            let count = self.counter.working_days(&self.calendar, task.start, span_end)?;
            if days < 0.0 { -count } else { count }
        };

        let moves = ShiftTaskTree::new(&mut self.tasks, &self.calendar).execute(id, working_days)?;
        info!(task = %id, working_days, moved = moves.len(), "task shifted");
        let mut report = MutationReport::default();
        let seeds = moves.iter().map(|change| change.task).collect();
        report.record_all(moves);
        self.propagate(seeds, Vec::new(), &mut report);
        Ok(self.finish(report, Vec::new()))
    }

    // ----- dependencies -----

    pub fn can_create_dependency(&self, dependant: TaskId, dependee: TaskId) -> bool {
        self.check_new_dependency(dependant, dependee).is_ok()
    }

    pub fn add_dependency(
        &mut self,
        dependant: TaskId,
        dependee: TaskId,
        constraint: Constraint,
        hardness: Hardness,
    ) -> Result<DependencyId, ScheduleError> {
        self.check_new_dependency(dependant, dependee)?;
        let id = self
            .dependencies
            .insert(dependant, dependee, constraint, hardness);
        self.rebuild_index();
        debug!(dependency = %id, %dependee, %dependant, %constraint, "dependency added");

        let mut report = MutationReport::default();
        self.propagate(vec![dependant], Vec::new(), &mut report);
        let events = self
            .dependencies
            .get(id)
            .copied()
            .map(ScheduleEvent::DependencyAdded)
            .into_iter()
            .collect();
        self.finish(report, events);
        Ok(id)
    }

    pub fn remove_dependency(&mut self, id: DependencyId) -> Result<MutationReport, ScheduleError> {
        let removed = self
            .dependencies
            .remove(id)
            .ok_or(ScheduleError::UnknownDependency(id))?;
        self.rebuild_index();
        let mut report = MutationReport::default();
        self.propagate(vec![removed.dependant], Vec::new(), &mut report);
        Ok(self.finish(report, vec![ScheduleEvent::DependencyRemoved(removed)]))
    }

    pub fn set_dependency_constraint(
        &mut self,
        id: DependencyId,
        constraint: Constraint,
    ) -> Result<MutationReport, ScheduleError> {
        let dep = self
            .dependencies
            .get_mut(id)
            .ok_or(ScheduleError::UnknownDependency(id))?;
        dep.constraint = constraint;
        let dependant = dep.dependant;
        let mut report = MutationReport::default();
        self.propagate(vec![dependant], Vec::new(), &mut report);
        Ok(self.finish(report, Vec::new()))
    }

    pub fn set_dependency_hardness(
        &mut self,
        id: DependencyId,
        hardness: Hardness,
    ) -> Result<MutationReport, ScheduleError> {
        let dep = self
            .dependencies
            .get_mut(id)
            .ok_or(ScheduleError::UnknownDependency(id))?;
        dep.hardness = hardness;
        let dependant = dep.dependant;
        let mut report = MutationReport::default();
        self.propagate(vec![dependant], Vec::new(), &mut report);
        Ok(self.finish(report, Vec::new()))
    }

    // ----- calendar -----

    pub fn set_weekday_type(&mut self, day: Weekday, day_type: DayType) -> MutationReport {
        self.calendar.set_weekday_type(day, day_type);
        self.after_calendar_change()
    }

    pub fn set_only_show_weekends(&mut self, value: bool) -> MutationReport {
        self.calendar.set_only_show_weekends(value);
        self.after_calendar_change()
    }

    pub fn set_calendar_events(&mut self, events: Vec<CalendarEvent>) -> MutationReport {
        self.calendar.set_events(events);
        self.after_calendar_change()
    }

    pub fn add_holiday(&mut self, date: NaiveDate, title: impl Into<String>) -> MutationReport {
        self.calendar.add_holiday(date, title);
        self.after_calendar_change()
    }

    pub fn set_calendar(&mut self, calendar: WorkCalendar) -> MutationReport {
        self.calendar = calendar;
        self.counter.invalidate();
        self.after_calendar_change()
    }

    pub fn import_calendar(&mut self, other: &WorkCalendar, mode: ImportMode) -> MutationReport {
        self.calendar.import_calendar(other, mode);
        self.after_calendar_change()
    }

    /// Re-lays every task on the current calendar and re-runs propagation
    /// over the whole schedule.
    pub fn recalculate_all(&mut self) -> MutationReport {
        let report = self.recalculate_everything();
        self.finish(report, Vec::new())
    }

    fn after_calendar_change(&mut self) -> MutationReport {
        info!(revision = self.calendar.revision(), "calendar changed");
        let report = self.recalculate_everything();
        let revision = self.calendar.revision();
        self.finish(report, vec![ScheduleEvent::CalendarChanged { revision }])
    }

    fn recalculate_everything(&mut self) -> MutationReport {
        let mut report = MutationReport::default();
        for id in self.tasks.ids() {
            let Some(task) = self.tasks.get(id) else {
                continue;
            };
            if task.is_summary() {
                continue;
            }
            let start = if task.milestone {
                Some(task.start)
            } else {
                self.calendar
                    .find_closest_working_day(task.start, MoveDirection::Forward)
            };
            let bounds = start.and_then(|start| {
                end_for(&self.calendar, start, task.working_days, task.milestone)
                    .map(|end| TaskBounds::new(start, end))
            });
            match bounds {
                Some(new) if new != task.bounds() => {
                    let change = ScheduleChange {
                        task: id,
                        old: task.bounds(),
                        new,
                    };
                    apply_moves(&mut self.tasks, &[change]);
                    report.record(change);
                }
                Some(_) => {}
                None => report.warn(ScheduleWarning::NoWorkingTime { task: id }),
            }
        }
        let adjusted = AdjustTaskBounds::new(&mut self.tasks, &self.calendar, &self.counter, self.units.day())
            .execute_all();
        report.record_all(adjusted);
        let everything = self.tasks.ids();
        self.propagate(everything, Vec::new(), &mut report);
        report
    }

    // ----- internals -----

    pub(crate) fn require(&self, id: TaskId) -> Result<&Task, ScheduleError> {
        self.tasks.get(id).ok_or(ScheduleError::UnknownTask(id))
    }

    fn require_mut(&mut self, id: TaskId) -> Result<&mut Task, ScheduleError> {
        self.tasks.get_mut(id).ok_or(ScheduleError::UnknownTask(id))
    }

    fn normalize_start(&self, id: TaskId, date: NaiveDate, milestone: bool) -> Result<NaiveDate, ScheduleError> {
        if milestone {
            return Ok(date);
        }
        self.calendar
            .find_closest_working_day(date, MoveDirection::Forward)
            .ok_or(ScheduleError::NoWorkingTime(id))
    }

    /// Working days a task starting at `anchor` spends for `duration`. Day
    /// durations are working days; larger units cover their calendar span.
    pub(crate) fn working_days_for(
        &self,
        id: TaskId,
        duration: &TimeDuration,
        anchor: NaiveDate,
    ) -> Result<i64, ScheduleError> {
        working_days_for(&self.units, &self.counter, &self.calendar, id, duration, anchor)
    }

    fn check_new_dependency(&self, dependant: TaskId, dependee: TaskId) -> Result<(), ScheduleError> {
        self.require(dependant)?;
        self.require(dependee)?;
        if dependant == dependee {
            return Err(ScheduleError::DependencyCycle { dependant, dependee });
        }
        if self.dependencies.find(dependant, dependee).is_some() {
            return Err(ScheduleError::DuplicateDependency { dependant, dependee });
        }
        if self.tasks.is_ancestor(dependant, dependee) || self.tasks.is_ancestor(dependee, dependant) {
            return Err(ScheduleError::HierarchyConflict { dependant, dependee });
        }
        let edges = self.edge_pairs().chain(iter::once((dependee, dependant)));
        if has_implicit_cycle(&self.tasks, edges) {
            return Err(ScheduleError::DependencyCycle { dependant, dependee });
        }
        Ok(())
    }

    fn edge_pairs(&self) -> impl Iterator<Item = (TaskId, TaskId)> + '_ {
        self.dependencies
            .iter()
            .map(|dep| (dep.dependee, dep.dependant))
    }

    fn set_leaf_span(
        &mut self,
        id: TaskId,
        end: NaiveDate,
        working_days: i64,
        duration: TimeDuration,
    ) -> Result<MutationReport, ScheduleError> {
        let task = self.require_mut(id)?;
        let old = task.bounds();
        task.end = end;
        task.working_days = working_days;
        task.duration = duration;
        let new = task.bounds();

        let mut report = MutationReport::default();
        report.record(ScheduleChange { task: id, old, new });
        self.propagate(vec![id], Vec::new(), &mut report);
        Ok(self.finish(report, Vec::new()))
    }

    fn commit_moves(&mut self, moves: Vec<ScheduleChange>) -> Result<MutationReport, ScheduleError> {
        apply_moves(&mut self.tasks, &moves);
        let mut report = MutationReport::default();
        let seeds = moves.iter().map(|change| change.task).collect();
        report.record_all(moves);
        self.propagate(seeds, Vec::new(), &mut report);
        Ok(self.finish(report, Vec::new()))
    }

    pub(crate) fn rebuild_index(&mut self) {
        self.dag = ScheduleDag::build(&self.tasks, &self.dependencies);
    }

    /// Alternates dependency recalculation and summary adjustment until a
    /// round changes nothing, then refreshes the critical path.
    fn propagate(&mut self, seeds: Vec<TaskId>, summaries: Vec<TaskId>, report: &mut MutationReport) {
        let cap = self.options.iteration_cap.max(1);
        let mut pending = seeds;
        let mut summaries = summaries;
        let mut rounds = 0;
        loop {
            let outcome = RecalculateSchedule::new(
                &mut self.tasks,
                &self.dependencies,
                &self.dag,
                &self.calendar,
                &self.counter,
                cap,
            )
            .execute(pending.iter().copied());
            for warning in outcome.warnings {
                report.warn(warning);
            }

            let mut touched: BTreeSet<TaskId> = pending.iter().copied().collect();
            touched.extend(outcome.changes.iter().map(|change| change.task));
            report.record_all(outcome.changes);

            let mut adjusted = AdjustTaskBounds::new(&mut self.tasks, &self.calendar, &self.counter, self.units.day())
                .execute_summaries(summaries.drain(..));
            adjusted.extend(
                AdjustTaskBounds::new(&mut self.tasks, &self.calendar, &self.counter, self.units.day())
                    .execute(touched),
            );
            if adjusted.is_empty() {
                break;
            }
            pending = adjusted.iter().map(|change| change.task).collect();
            report.record_all(adjusted);

            rounds += 1;
            if rounds >= cap {
                warn!(rounds, "schedule did not settle");
                report.warn(ScheduleWarning::NotConverged { iterations: rounds });
                break;
            }
        }
        self.refresh_critical_path();
    }

    fn refresh_critical_path(&mut self) {
        match CriticalPathAlgorithm::new(&self.tasks, &self.dependencies, &self.calendar, &self.counter).execute() {
            Ok(path) => self.critical_path = path,
            Err(err) => {
                warn!(%err, "critical path unavailable");
                self.critical_path = CriticalPath::default();
            }
        }
    }

    /// Settles the report, notifies listeners and remembers the report.
    fn finish(&mut self, mut report: MutationReport, mut events: Vec<ScheduleEvent>) -> MutationReport {
        report.settle();
        if !report.changes.is_empty() {
            events.push(ScheduleEvent::ScheduleChanged(report.changes.clone()));
        }
        for warning in &report.warnings {
            warn!(%warning, "mutation finished with a warning");
        }
        for event in &events {
            for listener in self.listeners.iter_mut() {
                listener(event);
            }
        }
        self.last_report = report.clone();
        report
    }

    /// Replaces the whole schedule state. Used by snapshot loading once the
    /// incoming data has been validated.
    pub(crate) fn replace_state(
        &mut self,
        metadata: ScheduleMetadata,
        options: SchedulerOptions,
        calendar: WorkCalendar,
        tasks: TaskArena,
        dependencies: DependencyTable,
    ) -> MutationReport {
        self.metadata = metadata;
        self.options = options;
        self.calendar = calendar;
        self.tasks = tasks;
        self.dependencies = dependencies;
        self.counter.invalidate();
        self.rebuild_index();
        let report = self.recalculate_everything();
        let revision = self.calendar.revision();
        self.finish(report, vec![ScheduleEvent::CalendarChanged { revision }])
    }
}

pub(crate) fn working_days_for(
    units: &TimeUnitStack,
    counter: &WorkingUnitCounter,
    calendar: &WorkCalendar,
    id: TaskId,
    duration: &TimeDuration,
    anchor: NaiveDate,
) -> Result<i64, ScheduleError> {
    if !units.graph().contains(duration.unit()) {
        return Err(TimeUnitError::UnknownUnit(duration.unit().name().to_string()).into());
    }
    let days = units.days_in(duration.length(), duration.unit(), anchor)?;
    if !days.is_finite() || days < 0.0 {
        return Err(ScheduleError::InvalidDuration {
            task: id,
            reason: format!("{duration} is negative"),
        });
    }
    let span_end = calendar_span_end(id, anchor, days)?;
    if duration.unit() == units.day() {
        return Ok(days.round() as i64);
    }
    Ok(counter.working_days(calendar, anchor, span_end)?)
}

/// `anchor` plus `days` calendar days, rejected when the result falls
/// outside the representable date range.
pub(crate) fn calendar_span_end(id: TaskId, anchor: NaiveDate, days: f64) -> Result<NaiveDate, ScheduleError> {
    let out_of_range = || ScheduleError::InvalidDuration {
        task: id,
        reason: format!("{days} days from {anchor} is outside the supported date range"),
    };
    if !days.is_finite() {
        return Err(out_of_range());
    }
    TimeDelta::try_days(days.round() as i64)
        .and_then(|delta| anchor.checked_add_signed(delta))
        .ok_or_else(out_of_range)
}

/// Ids in `tasks` that appear more than once.
pub(crate) fn duplicate_ids(ids: impl IntoIterator<Item = TaskId>) -> Option<TaskId> {
    let mut seen = HashSet::new();
    ids.into_iter().find(|id| !seen.insert(*id))
}
