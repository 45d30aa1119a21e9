use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::info;

use crate::calculations::end_for;
use crate::calculations::working_units::WorkingUnitCounter;
use crate::calendar::{MoveDirection, WorkCalendar, WorkCalendarConfig};
use crate::dependency::{Constraint, DependencyTable, Hardness};
use crate::errors::ScheduleError;
use crate::graph::has_implicit_cycle;
use crate::metadata::{ScheduleMetadata, SchedulerOptions};
use crate::report::MutationReport;
use crate::schedule::{Schedule, calendar_span_end, duplicate_ids, working_days_for};
use crate::task::{Priority, Task, TaskArena, TaskId};
use crate::time_unit::{TimeDuration, TimeUnitError};

fn default_unit() -> String {
    "day".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: TaskId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<TaskId>,
    pub start: NaiveDate,
    #[serde(default)]
    pub duration: f64,
    #[serde(default = "default_unit")]
    pub unit: String,
    /// Length in working days as last laid out. When absent it is derived
    /// from `duration` and `unit` anchored at `start`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_days: Option<i64>,
    #[serde(default)]
    pub milestone: bool,
    #[serde(default)]
    pub completion: u8,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earliest_begin: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyRecord {
    pub dependant: TaskId,
    pub dependee: TaskId,
    #[serde(default)]
    pub constraint: Constraint,
    #[serde(default)]
    pub hardness: Hardness,
}

/// Plain-data image of a schedule. Task records are listed parents first,
/// siblings in order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScheduleSnapshot {
    #[serde(default)]
    pub metadata: ScheduleMetadata,
    #[serde(default)]
    pub options: SchedulerOptions,
    #[serde(default)]
    pub calendar: WorkCalendarConfig,
    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
    #[serde(default)]
    pub dependencies: Vec<DependencyRecord>,
}

impl ScheduleSnapshot {
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl From<&Task> for TaskRecord {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            name: task.name.clone(),
            notes: task.notes.clone(),
            parent: task.parent,
            start: task.start,
            duration: task.duration.length(),
            unit: task.duration.unit().name().to_string(),
            working_days: Some(task.working_days),
            milestone: task.milestone,
            completion: task.completion,
            priority: task.priority,
            earliest_begin: task.earliest_begin,
        }
    }
}

impl Schedule {
    pub fn from_snapshot(snapshot: ScheduleSnapshot) -> Result<Self, ScheduleError> {
        let mut schedule = Schedule::new();
        schedule.load(snapshot)?;
        Ok(schedule)
    }

    pub fn snapshot(&self) -> ScheduleSnapshot {
        ScheduleSnapshot {
            metadata: self.metadata.clone(),
            options: self.options,
            calendar: self.calendar.to_config(),
            tasks: self.tasks.iter().map(TaskRecord::from).collect(),
            dependencies: self
                .dependencies
                .iter()
                .map(|dep| DependencyRecord {
                    dependant: dep.dependant,
                    dependee: dep.dependee,
                    constraint: dep.constraint,
                    hardness: dep.hardness,
                })
                .collect(),
        }
    }

    /// Replaces the schedule with `snapshot` after validating all of it,
    /// then recalculates everything once. Nothing changes on error.
    pub fn load(&mut self, snapshot: ScheduleSnapshot) -> Result<MutationReport, ScheduleError> {
        let calendar = WorkCalendar::from_config(&snapshot.calendar);
        let ordered = parent_first(&snapshot.tasks)?;

        let counter = WorkingUnitCounter::new();
        let mut tasks = TaskArena::new();
        for record in ordered {
            let task = self.task_from_record(record, &calendar, &counter)?;
            tasks.insert(task);
        }

        let mut dependencies = DependencyTable::new();
        for record in &snapshot.dependencies {
            let (dependant, dependee) = (record.dependant, record.dependee);
            for id in [dependant, dependee] {
                if !tasks.contains(id) {
                    return Err(ScheduleError::UnknownTask(id));
                }
            }
            if dependant == dependee {
                return Err(ScheduleError::DependencyCycle { dependant, dependee });
            }
            if dependencies.find(dependant, dependee).is_some() {
                return Err(ScheduleError::DuplicateDependency { dependant, dependee });
            }
            if tasks.is_ancestor(dependant, dependee) || tasks.is_ancestor(dependee, dependant) {
                return Err(ScheduleError::HierarchyConflict { dependant, dependee });
            }
            dependencies.insert(dependant, dependee, record.constraint, record.hardness);
            let edges = dependencies.iter().map(|dep| (dep.dependee, dep.dependant));
            if has_implicit_cycle(&tasks, edges) {
                return Err(ScheduleError::DependencyCycle { dependant, dependee });
            }
        }

        info!(
            tasks = tasks.len(),
            dependencies = dependencies.len(),
            project = %snapshot.metadata.project_name,
            "schedule loaded"
        );
        Ok(self.replace_state(snapshot.metadata, snapshot.options, calendar, tasks, dependencies))
    }

    fn task_from_record(
        &self,
        record: &TaskRecord,
        calendar: &WorkCalendar,
        counter: &WorkingUnitCounter,
    ) -> Result<Task, ScheduleError> {
        if record.completion > 100 {
            return Err(ScheduleError::InvalidCompletion {
                task: record.id,
                value: record.completion,
            });
        }
        let unit = self
            .units
            .find_unit(&record.unit)
            .ok_or_else(|| TimeUnitError::UnknownUnit(record.unit.clone()))?;
        let duration = TimeDuration::new(record.duration, unit);
        let start = if record.milestone {
            record.start
        } else {
            calendar
                .find_closest_working_day(record.start, MoveDirection::Forward)
                .ok_or(ScheduleError::NoWorkingTime(record.id))?
        };
        let working_days = match record.working_days {
            _ if record.milestone => 0,
            Some(days) if days < 0 => {
                return Err(ScheduleError::InvalidDuration {
                    task: record.id,
                    reason: format!("{days} working days is negative"),
                });
            }
            Some(days) => {
                calendar_span_end(record.id, start, days as f64)?;
                days
            }
            None => working_days_for(&self.units, counter, calendar, record.id, &duration, start)?,
        };
        let end = end_for(calendar, start, working_days, record.milestone)
            .ok_or(ScheduleError::NoWorkingTime(record.id))?;

        Ok(Task {
            id: record.id,
            name: record.name.clone(),
            notes: record.notes.clone(),
            start,
            end,
            duration,
            working_days,
            completion: record.completion,
            milestone: record.milestone,
            priority: record.priority,
            parent: record.parent,
            children: Vec::new(),
            earliest_begin: record.earliest_begin,
        })
    }
}

/// Orders records so every parent precedes its children, keeping the
/// original order among siblings.
fn parent_first(records: &[TaskRecord]) -> Result<Vec<&TaskRecord>, ScheduleError> {
    if let Some(duplicate) = duplicate_ids(records.iter().map(|record| record.id)) {
        return Err(ScheduleError::DuplicateTaskId(duplicate));
    }
    let parents: HashMap<TaskId, Option<TaskId>> = records
        .iter()
        .map(|record| (record.id, record.parent))
        .collect();
    for record in records {
        if let Some(parent) = record.parent {
            if !parents.contains_key(&parent) {
                return Err(ScheduleError::UnknownTask(parent));
            }
        }
        let mut current = record.parent;
        let mut steps = 0;
        while let Some(ancestor) = current {
            if ancestor == record.id || steps > records.len() {
                return Err(ScheduleError::ContainmentCycle {
                    task: record.id,
                    parent: record.parent.unwrap_or(ancestor),
                });
            }
            steps += 1;
            current = parents.get(&ancestor).copied().flatten();
        }
    }

    let mut placed: HashSet<TaskId> = HashSet::new();
    let mut ordered = Vec::with_capacity(records.len());
    while ordered.len() < records.len() {
        for record in records {
            if placed.contains(&record.id) {
                continue;
            }
            if record.parent.is_none_or(|parent| placed.contains(&parent)) {
                placed.insert(record.id);
                ordered.push(record);
            }
        }
    }
    Ok(ordered)
}
