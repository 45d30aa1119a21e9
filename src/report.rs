use serde::Serialize;
use std::fmt;

use crate::dependency::BindingUnavailable;
use crate::task::{TaskBounds, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScheduleChange {
    pub task: TaskId,
    pub old: TaskBounds,
    pub new: TaskBounds,
}

/// Non-fatal conditions met while propagating a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleWarning {
    /// Propagation stopped at the iteration cap; the schedule may not
    /// satisfy every dependency.
    NotConverged { iterations: usize },
    /// A dependency was skipped because one side has no working time.
    BindingUnavailable(BindingUnavailable),
    /// A task could not be placed because the calendar has no working day
    /// within reach.
    NoWorkingTime { task: TaskId },
}

impl fmt::Display for ScheduleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleWarning::NotConverged { iterations } => {
                write!(f, "recalculation stopped after {iterations} iterations without converging")
            }
            ScheduleWarning::BindingUnavailable(err) => write!(f, "{err}"),
            ScheduleWarning::NoWorkingTime { task } => {
                write!(f, "task {task} cannot be placed: no working time")
            }
        }
    }
}

/// Net effect of one mutation: final bounds per moved task and any
/// warnings raised on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationReport {
    pub changes: Vec<ScheduleChange>,
    pub warnings: Vec<ScheduleWarning>,
}

impl MutationReport {
    /// Folds `change` into the report, keeping the first recorded old
    /// bounds for a task and the latest new ones.
    pub(crate) fn record(&mut self, change: ScheduleChange) {
        match self.changes.iter_mut().find(|existing| existing.task == change.task) {
            Some(existing) => existing.new = change.new,
            None => self.changes.push(change),
        }
    }

    pub(crate) fn record_all<I>(&mut self, changes: I)
    where
        I: IntoIterator<Item = ScheduleChange>,
    {
        for change in changes {
            self.record(change);
        }
    }

    pub(crate) fn warn(&mut self, warning: ScheduleWarning) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }

    /// Drops entries whose bounds ended where they started.
    pub(crate) fn settle(&mut self) {
        self.changes.retain(|change| change.old != change.new);
        self.changes.sort_by_key(|change| change.task);
    }

    pub fn converged(&self) -> bool {
        !self
            .warnings
            .iter()
            .any(|warning| matches!(warning, ScheduleWarning::NotConverged { .. }))
    }

    pub fn change_for(&self, task: TaskId) -> Option<&ScheduleChange> {
        self.changes.iter().find(|change| change.task == task)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.warnings.is_empty()
    }

    pub fn to_cli_summary(&self) -> String {
        let mut parts = Vec::new();
        parts.push(format!("moved={}", self.changes.len()));
        if !self.warnings.is_empty() {
            parts.push(format!("warnings={}", self.warnings.len()));
        }
        if !self.converged() {
            parts.push("not_converged".to_string());
        }
        let moves = self
            .changes
            .iter()
            .map(|change| format!("{}:{}", change.task, change.new.start))
            .collect::<Vec<_>>();
        if !moves.is_empty() {
            parts.push(format!("starts={}", moves.join(",")));
        }
        parts.join(", ")
    }
}
