use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::dependency::{DependencyId, DependencyTable};
use crate::task::{TaskArena, TaskId};

/// Index over explicit dependencies: one node per task, one edge per
/// dependency pointing from dependee to dependant. Rebuilt whenever tasks
/// or dependencies are added or removed.
#[derive(Debug, Clone, Default)]
pub struct ScheduleDag {
    pub graph: DiGraph<TaskId, DependencyId>,
    pub id_to_index: HashMap<TaskId, NodeIndex>,
}

impl ScheduleDag {
    pub fn build(tasks: &TaskArena, dependencies: &DependencyTable) -> Self {
        let mut graph: DiGraph<TaskId, DependencyId> = DiGraph::new();
        let mut id_to_index: HashMap<TaskId, NodeIndex> = HashMap::new();

        // Add nodes first
        for task_id in tasks.ids() {
            let node_ix = graph.add_node(task_id);
            id_to_index.insert(task_id, node_ix);
        }

        // Add edges: dependee -> dependant
        for dep in dependencies.iter() {
            if let (Some(&u), Some(&v)) = (id_to_index.get(&dep.dependee), id_to_index.get(&dep.dependant)) {
                graph.add_edge(u, v, dep.id);
            }
        }

        Self { graph, id_to_index }
    }

    /// Dependencies where `task` is the dependant, ordered by id.
    pub fn dependencies_as_dependant(&self, task: TaskId) -> Vec<DependencyId> {
        self.edges(task, Direction::Incoming)
    }

    /// Dependencies where `task` is the dependee, ordered by id.
    pub fn dependencies_as_dependee(&self, task: TaskId) -> Vec<DependencyId> {
        self.edges(task, Direction::Outgoing)
    }

    fn edges(&self, task: TaskId, direction: Direction) -> Vec<DependencyId> {
        let Some(&node_ix) = self.id_to_index.get(&task) else {
            return Vec::new();
        };
        let mut ids: Vec<DependencyId> = self
            .graph
            .edges_directed(node_ix, direction)
            .map(|edge| *edge.weight())
            .collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::{Constraint, Hardness};
    use crate::{NewTask, Schedule};

    #[test]
    fn edges_point_from_dependee_to_dependant() {
        let mut schedule = Schedule::new();
        let a = schedule.create_task(NewTask::named("a")).unwrap();
        let b = schedule.create_task(NewTask::named("b")).unwrap();
        let c = schedule.create_task(NewTask::named("c")).unwrap();
        let ab = schedule
            .add_dependency(b, a, Constraint::finish_start(), Hardness::Strict)
            .unwrap();
        let bc = schedule
            .add_dependency(c, b, Constraint::finish_start(), Hardness::Strict)
            .unwrap();

        let dag = ScheduleDag::build(schedule.task_arena(), &schedule.dependencies);
        assert_eq!(dag.dependencies_as_dependee(b), vec![bc]);
        assert_eq!(dag.dependencies_as_dependant(b), vec![ab]);
        assert!(dag.dependencies_as_dependant(TaskId(9)).is_empty());
    }
}
