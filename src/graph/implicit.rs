//! Cycle detection over the effective dependency graph.
//!
//! Besides explicit edges, a schedule carries implicit ones: every child
//! feeds its parent's bounds, and a dependency on a summary task is
//! inherited by every task below it. A new dependency or a reparenting is
//! only accepted if the effective graph stays acyclic.

use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::task::{TaskArena, TaskId};

/// `edges` are `(dependee, dependant)` pairs.
pub fn has_implicit_cycle<I>(tasks: &TaskArena, edges: I) -> bool
where
    I: IntoIterator<Item = (TaskId, TaskId)>,
{
    let mut graph: DiGraph<TaskId, ()> = DiGraph::new();
    let mut index: HashMap<TaskId, NodeIndex> = HashMap::new();
    for task_id in tasks.ids() {
        index.insert(task_id, graph.add_node(task_id));
    }

    for task_id in tasks.ids() {
        if let (Some(parent), Some(&child_ix)) = (tasks.parent_of(task_id), index.get(&task_id)) {
            if let Some(&parent_ix) = index.get(&parent) {
                graph.add_edge(child_ix, parent_ix, ());
            }
        }
    }

    for (dependee, dependant) in edges {
        if dependee == dependant {
            return true;
        }
        let Some(&from) = index.get(&dependee) else {
            continue;
        };
        let mut targets = vec![dependant];
        targets.extend(tasks.descendants(dependant));
        for target in targets {
            if let Some(&to) = index.get(&target) {
                graph.add_edge(from, to, ());
            }
        }
    }

    is_cyclic_directed(&graph)
}
