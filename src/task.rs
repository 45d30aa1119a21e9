use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::time_unit::TimeDuration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub u32);

impl TaskId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Lowest,
    Low,
    #[default]
    Normal,
    High,
    Highest,
}

/// Half-open date span: `end` is the day after the last day of work.
/// Milestones have `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskBounds {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TaskBounds {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for TaskBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// A node in the task tree.
///
/// Fields are only written by [`crate::Schedule`] so that bounds, duration
/// and the hierarchy can never be observed out of step with each other.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub(crate) id: TaskId,
    pub(crate) name: String,
    pub(crate) notes: Option<String>,
    pub(crate) start: NaiveDate,
    pub(crate) end: NaiveDate,
    pub(crate) duration: TimeDuration,
    pub(crate) working_days: i64,
    pub(crate) completion: u8,
    pub(crate) milestone: bool,
    pub(crate) priority: Priority,
    pub(crate) parent: Option<TaskId>,
    pub(crate) children: Vec<TaskId>,
    pub(crate) earliest_begin: Option<NaiveDate>,
}

impl Task {
    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn bounds(&self) -> TaskBounds {
        TaskBounds::new(self.start, self.end)
    }

    /// Duration as the caller expressed it (summaries report days).
    pub fn duration(&self) -> &TimeDuration {
        &self.duration
    }

    /// Number of working days inside `[start, end)`.
    pub fn working_days(&self) -> i64 {
        self.working_days
    }

    pub fn completion(&self) -> u8 {
        self.completion
    }

    pub fn is_milestone(&self) -> bool {
        self.milestone
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn parent(&self) -> Option<TaskId> {
        self.parent
    }

    pub fn children(&self) -> &[TaskId] {
        &self.children
    }

    pub fn is_summary(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn earliest_begin(&self) -> Option<NaiveDate> {
        self.earliest_begin
    }
}

/// Arguments for [`crate::Schedule::create_task`].
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub name: String,
    pub start: Option<NaiveDate>,
    pub duration: Option<TimeDuration>,
    pub milestone: bool,
    pub parent: Option<TaskId>,
}

impl NewTask {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn starting(mut self, start: NaiveDate) -> Self {
        self.start = Some(start);
        self
    }

    pub fn lasting(mut self, duration: TimeDuration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn milestone(mut self) -> Self {
        self.milestone = true;
        self
    }

    pub fn under(mut self, parent: TaskId) -> Self {
        self.parent = Some(parent);
        self
    }
}

/// Tasks keyed by id, plus the containment queries. Ids handed out by
/// `next_id` only ever grow, so a deleted task's id is never reused.
#[derive(Debug, Clone, Default)]
pub struct TaskArena {
    tasks: BTreeMap<TaskId, Task>,
    next: u64,
    roots: Vec<TaskId>,
}

impl TaskArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` once every `u32` id has been handed out.
    pub fn next_id(&self) -> Option<TaskId> {
        u32::try_from(self.next).ok().map(TaskId)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.get_mut(&id)
    }

    /// Inserts `task` under its declared parent (or as a root), appended
    /// after existing siblings. The parent must already be present.
    pub(crate) fn insert(&mut self, task: Task) {
        let id = task.id;
        match task.parent {
            Some(parent) => {
                if let Some(parent) = self.get_mut(parent) {
                    parent.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        self.next = self.next.max(u64::from(id.0) + 1);
        self.tasks.insert(id, task);
    }

    /// Removes `id` and its whole subtree; returns the removed tasks,
    /// subtree root first.
    pub(crate) fn remove_subtree(&mut self, id: TaskId) -> Vec<Task> {
        let mut ids = vec![id];
        ids.extend(self.descendants(id));
        self.detach(id);
        ids.into_iter()
            .filter_map(|id| self.tasks.remove(&id))
            .collect()
    }

    /// Moves `id` under `new_parent` (or to the root level), appended last.
    pub(crate) fn reparent(&mut self, id: TaskId, new_parent: Option<TaskId>) {
        self.detach(id);
        match new_parent {
            Some(parent) => {
                if let Some(parent) = self.get_mut(parent) {
                    parent.children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        if let Some(task) = self.get_mut(id) {
            task.parent = new_parent;
        }
    }

    fn detach(&mut self, id: TaskId) {
        match self.parent_of(id) {
            Some(parent) => {
                if let Some(parent) = self.get_mut(parent) {
                    parent.children.retain(|child| *child != id);
                }
            }
            None => self.roots.retain(|root| *root != id),
        }
    }

    /// Tasks in depth-first pre-order, siblings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Task> + '_ {
        self.preorder().into_iter().filter_map(|id| self.get(id))
    }

    pub fn ids(&self) -> Vec<TaskId> {
        self.preorder()
    }

    pub fn roots(&self) -> &[TaskId] {
        &self.roots
    }

    pub fn parent_of(&self, id: TaskId) -> Option<TaskId> {
        self.get(id).and_then(|task| task.parent)
    }

    pub fn children_of(&self, id: TaskId) -> &[TaskId] {
        self.get(id).map(|task| task.children.as_slice()).unwrap_or(&[])
    }

    pub fn is_summary(&self, id: TaskId) -> bool {
        !self.children_of(id).is_empty()
    }

    /// Nearest ancestor first.
    pub fn ancestors(&self, id: TaskId) -> Vec<TaskId> {
        let mut result = Vec::new();
        let mut current = self.parent_of(id);
        while let Some(parent) = current {
            if result.contains(&parent) {
                break;
            }
            result.push(parent);
            current = self.parent_of(parent);
        }
        result
    }

    pub fn is_ancestor(&self, ancestor: TaskId, of: TaskId) -> bool {
        self.ancestors(of).contains(&ancestor)
    }

    /// Every task below `id`, pre-order, excluding `id` itself.
    pub fn descendants(&self, id: TaskId) -> Vec<TaskId> {
        let mut result = Vec::new();
        let mut stack: Vec<TaskId> = self.children_of(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            result.push(next);
            stack.extend(self.children_of(next).iter().rev().copied());
        }
        result
    }

    /// `id` itself if it is a leaf, otherwise every leaf below it.
    pub fn leaves_under(&self, id: TaskId) -> Vec<TaskId> {
        if !self.is_summary(id) {
            return vec![id];
        }
        self.descendants(id)
            .into_iter()
            .filter(|candidate| !self.is_summary(*candidate))
            .collect()
    }

    pub fn depth(&self, id: TaskId) -> usize {
        self.ancestors(id).len()
    }

    fn preorder(&self) -> Vec<TaskId> {
        let mut result = Vec::with_capacity(self.tasks.len());
        for root in &self.roots {
            result.push(*root);
            result.extend(self.descendants(*root));
        }
        result
    }
}
