use chrono::NaiveDate;
use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;
use tracing::{debug, warn};

use crate::calculations::end_for;
use crate::calculations::working_units::WorkingUnitCounter;
use crate::calendar::WorkCalendar;
use crate::dependency::{Constraint, DependencyTable, ScheduledSpan};
use crate::task::{TaskArena, TaskId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CriticalPathError {
    #[error("dependency cycle through task {0}")]
    Cycle(TaskId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CriticalPathNode {
    pub task: TaskId,
    pub earliest_start: NaiveDate,
    pub earliest_finish: NaiveDate,
    pub latest_start: NaiveDate,
    pub latest_finish: NaiveDate,
    /// Working days between earliest and latest finish.
    pub total_float: i64,
    pub critical: bool,
}

/// Result of one critical-path pass over the whole schedule.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CriticalPath {
    nodes: BTreeMap<TaskId, CriticalPathNode>,
    project_finish: Option<NaiveDate>,
}

impl CriticalPath {
    pub fn node(&self, task: TaskId) -> Option<&CriticalPathNode> {
        self.nodes.get(&task)
    }

    pub fn is_critical(&self, task: TaskId) -> bool {
        self.nodes.get(&task).is_some_and(|node| node.critical)
    }

    pub fn total_float(&self, task: TaskId) -> Option<i64> {
        self.nodes.get(&task).map(|node| node.total_float)
    }

    pub fn critical_tasks(&self) -> BTreeSet<TaskId> {
        self.nodes
            .values()
            .filter(|node| node.critical)
            .map(|node| node.task)
            .collect()
    }

    /// Critical tasks ordered by earliest start, then id.
    pub fn chain(&self) -> Vec<TaskId> {
        let mut chain: Vec<(NaiveDate, TaskId)> = self
            .nodes
            .values()
            .filter(|node| node.critical)
            .map(|node| (node.earliest_start, node.task))
            .collect();
        chain.sort();
        chain.into_iter().map(|(_, task)| task).collect()
    }

    pub fn project_finish(&self) -> Option<NaiveDate> {
        self.project_finish
    }
}

/// Forward and backward pass over leaf tasks.
///
/// Dependencies that touch a summary task are lifted to every leaf below
/// it. The backward pass is anchored at the latest earliest-finish, so a
/// task with no successors is critical exactly when it ends the project.
/// Summary tasks are critical when any task below them is.
pub struct CriticalPathAlgorithm<'a> {
    tasks: &'a TaskArena,
    dependencies: &'a DependencyTable,
    calendar: &'a WorkCalendar,
    counter: &'a WorkingUnitCounter,
}

impl<'a> CriticalPathAlgorithm<'a> {
    pub fn new(
        tasks: &'a TaskArena,
        dependencies: &'a DependencyTable,
        calendar: &'a WorkCalendar,
        counter: &'a WorkingUnitCounter,
    ) -> Self {
        Self {
            tasks,
            dependencies,
            calendar,
            counter,
        }
    }

    pub fn execute(&self) -> Result<CriticalPath, CriticalPathError> {
        let mut graph: DiGraph<TaskId, Constraint> = DiGraph::new();
        let mut id_to_index: HashMap<TaskId, NodeIndex> = HashMap::new();
        for task in self.tasks.iter().filter(|task| !task.is_summary()) {
            id_to_index.insert(task.id, graph.add_node(task.id));
        }
        for dep in self.dependencies.iter() {
            for dependee in self.tasks.leaves_under(dep.dependee) {
                for dependant in self.tasks.leaves_under(dep.dependant) {
                    if let (Some(&u), Some(&v)) = (id_to_index.get(&dependee), id_to_index.get(&dependant)) {
                        if u != v {
                            graph.add_edge(u, v, dep.constraint);
                        }
                    }
                }
            }
        }

        let order = toposort(&graph, None)
            .map_err(|cycle| CriticalPathError::Cycle(graph[cycle.node_id()]))?;

        // Forward pass
        let mut early: HashMap<NodeIndex, ScheduledSpan> = HashMap::new();
        for &node_ix in &order {
            let Some(task) = self.tasks.get(graph[node_ix]) else {
                continue;
            };
            let mut earliest_start: Option<NaiveDate> = None;
            for edge in graph.edges_directed(node_ix, Direction::Incoming) {
                let Some(pred) = early.get(&edge.source()) else {
                    continue;
                };
                match edge.weight().acceptable_start(pred, task.working_days, self.calendar) {
                    Some(start) => earliest_start = earliest_start.max(Some(start)),
                    None => warn!(task = %task.id, "dependency has no working time, ignored for critical path"),
                }
            }
            let mut start = earliest_start.unwrap_or(task.start);
            if let Some(earliest) = task.earliest_begin {
                start = start.max(earliest);
            }
            let end = end_for(self.calendar, start, task.working_days, task.milestone).unwrap_or(task.end);
            early.insert(
                node_ix,
                ScheduledSpan {
                    start,
                    end,
                    working_days: task.working_days,
                    milestone: task.milestone,
                },
            );
        }

        let project_finish = early.values().map(|span| span.end).max();
        let mut result = CriticalPath {
            nodes: BTreeMap::new(),
            project_finish,
        };
        let Some(project_finish) = project_finish else {
            return Ok(result);
        };

        // Backward pass in reverse topological order
        let mut late: HashMap<NodeIndex, ScheduledSpan> = HashMap::new();
        for &node_ix in order.iter().rev() {
            let Some(span) = early.get(&node_ix).copied() else {
                continue;
            };
            let mut latest_finish = project_finish;
            for edge in graph.edges_directed(node_ix, Direction::Outgoing) {
                let Some(succ) = late.get(&edge.target()) else {
                    continue;
                };
                if let Some(finish) = edge
                    .weight()
                    .latest_dependee_finish(succ, span.working_days, self.calendar)
                {
                    latest_finish = latest_finish.min(finish);
                }
            }
            let latest_start = if span.milestone {
                latest_finish
            } else {
                self.calendar
                    .retreat(latest_finish, span.working_days)
                    .unwrap_or(span.start)
            };
            late.insert(
                node_ix,
                ScheduledSpan {
                    start: latest_start,
                    end: latest_finish,
                    ..span
                },
            );

            let total_float = self
                .counter
                .signed_working_days(self.calendar, span.end, latest_finish);
            let task = graph[node_ix];
            result.nodes.insert(
                task,
                CriticalPathNode {
                    task,
                    earliest_start: span.start,
                    earliest_finish: span.end,
                    latest_start,
                    latest_finish,
                    total_float,
                    critical: total_float <= 0,
                },
            );
        }

        self.roll_up_summaries(&mut result);
        debug!(
            critical = result.critical_tasks().len(),
            finish = %project_finish,
            "critical path computed"
        );
        Ok(result)
    }

    fn roll_up_summaries(&self, result: &mut CriticalPath) {
        for task in self.tasks.iter().filter(|task| task.is_summary()) {
            let below: Vec<CriticalPathNode> = self
                .tasks
                .leaves_under(task.id)
                .into_iter()
                .filter_map(|leaf| result.nodes.get(&leaf).copied())
                .collect();
            let (Some(earliest_start), Some(earliest_finish), Some(latest_start), Some(latest_finish), Some(total_float)) = (
                below.iter().map(|node| node.earliest_start).min(),
                below.iter().map(|node| node.earliest_finish).max(),
                below.iter().map(|node| node.latest_start).min(),
                below.iter().map(|node| node.latest_finish).max(),
                below.iter().map(|node| node.total_float).min(),
            ) else {
                continue;
            };
            result.nodes.insert(
                task.id,
                CriticalPathNode {
                    task: task.id,
                    earliest_start,
                    earliest_finish,
                    latest_start,
                    latest_finish,
                    total_float,
                    critical: below.iter().any(|node| node.critical),
                },
            );
        }
    }
}
