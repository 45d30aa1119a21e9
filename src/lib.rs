pub mod calculations;
pub mod calendar;
pub mod dependency;
pub mod errors;
pub mod events;
pub mod frame;
pub mod graph;
#[cfg(feature = "cli")]
pub mod logging;
pub mod metadata;
pub mod persistence;
pub mod report;
pub mod schedule;
pub mod shared;
pub mod snapshot;
pub mod task;
pub mod time_unit;

pub use calculations::critical_path::{CriticalPath, CriticalPathError, CriticalPathNode};
pub use calculations::shift_tree::ShiftRejected;
pub use calculations::working_units::{CountError, InvalidRangeError, WorkingUnitCounter};
pub use calendar::{
    CalendarActivity, CalendarEvent, CalendarEventType, DayMask, DayType, ImportMode, MoveDirection,
    WorkCalendar, WorkCalendarConfig,
};
pub use dependency::{
    BindingUnavailable, Collision, Constraint, ConstraintKind, DependencyId, Hardness, TaskDependency,
};
pub use errors::ScheduleError;
pub use events::ScheduleEvent;
pub use metadata::{ScheduleMetadata, SchedulerOptions};
pub use persistence::{
    JsonFileStore, PersistenceError, ScheduleStore, load_schedule_from_json, save_schedule_to_json,
};
pub use report::{MutationReport, ScheduleChange, ScheduleWarning};
pub use schedule::Schedule;
pub use shared::SharedSchedule;
pub use snapshot::{DependencyRecord, ScheduleSnapshot, TaskRecord};
pub use task::{NewTask, Priority, Task, TaskBounds, TaskId};
pub use time_unit::{DateFrame, TimeDuration, TimeUnit, TimeUnitError, TimeUnitGraph, TimeUnitStack};
