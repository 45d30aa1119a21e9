use thiserror::Error;

use crate::calculations::critical_path::CriticalPathError;
use crate::calculations::shift_tree::ShiftRejected;
use crate::calculations::working_units::{CountError, InvalidRangeError};
use crate::dependency::DependencyId;
use crate::task::TaskId;
use crate::time_unit::TimeUnitError;

/// Errors returned by schedule mutations. A mutation that fails leaves the
/// schedule exactly as it was.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("task {0} does not exist")]
    UnknownTask(TaskId),
    #[error("dependency {0} does not exist")]
    UnknownDependency(DependencyId),
    #[error("dependency {dependee} -> {dependant} would create a cycle")]
    DependencyCycle { dependant: TaskId, dependee: TaskId },
    #[error("dependency {dependee} -> {dependant} already exists")]
    DuplicateDependency { dependant: TaskId, dependee: TaskId },
    #[error("tasks {dependant} and {dependee} are in an ancestor relationship")]
    HierarchyConflict { dependant: TaskId, dependee: TaskId },
    #[error("moving task {task} under {parent} would make it its own ancestor")]
    ContainmentCycle { task: TaskId, parent: TaskId },
    #[error("bounds of summary task {0} are derived from its children")]
    DerivedBounds(TaskId),
    #[error("invalid duration for task {task}: {reason}")]
    InvalidDuration { task: TaskId, reason: String },
    #[error("completion {value} for task {task} is outside 0..=100")]
    InvalidCompletion { task: TaskId, value: u8 },
    #[error("task {0} cannot be placed: the calendar has no working time")]
    NoWorkingTime(TaskId),
    #[error("task id {0} appears more than once")]
    DuplicateTaskId(TaskId),
    #[error("no task ids left to allocate")]
    TaskIdsExhausted,
    #[error("schedule is already being mutated")]
    ReentrantMutation,
    #[error(transparent)]
    ShiftRejected(#[from] ShiftRejected),
    #[error(transparent)]
    TimeUnit(#[from] TimeUnitError),
    #[error(transparent)]
    Count(#[from] CountError),
    #[error(transparent)]
    InvalidRange(#[from] InvalidRangeError),
    #[error(transparent)]
    CriticalPath(#[from] CriticalPathError),
    #[error("snapshot: {0}")]
    Snapshot(#[from] serde_json::Error),
}
