use crate::dependency::TaskDependency;
use crate::report::ScheduleChange;

/// Notification delivered to subscribers after a mutation has fully
/// propagated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleEvent {
    /// Net bound changes for every task that moved.
    ScheduleChanged(Vec<ScheduleChange>),
    DependencyAdded(TaskDependency),
    DependencyRemoved(TaskDependency),
    CalendarChanged { revision: u64 },
}

pub type ScheduleListener = Box<dyn FnMut(&ScheduleEvent)>;
