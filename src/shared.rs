use std::cell::RefCell;
use std::rc::Rc;

use crate::errors::ScheduleError;
use crate::schedule::Schedule;

/// Single-threaded shared handle to a schedule.
///
/// A listener that reaches back into the schedule while a mutation is still
/// running gets [`ScheduleError::ReentrantMutation`] instead of a panic.
#[derive(Debug, Clone, Default)]
pub struct SharedSchedule(Rc<RefCell<Schedule>>);

impl SharedSchedule {
    pub fn new(schedule: Schedule) -> Self {
        Self(Rc::new(RefCell::new(schedule)))
    }

    pub fn read<R>(&self, f: impl FnOnce(&Schedule) -> R) -> Result<R, ScheduleError> {
        let schedule = self
            .0
            .try_borrow()
            .map_err(|_| ScheduleError::ReentrantMutation)?;
        Ok(f(&schedule))
    }

    pub fn mutate<R>(
        &self,
        f: impl FnOnce(&mut Schedule) -> Result<R, ScheduleError>,
    ) -> Result<R, ScheduleError> {
        let mut schedule = self
            .0
            .try_borrow_mut()
            .map_err(|_| ScheduleError::ReentrantMutation)?;
        f(&mut schedule)
    }
}
