pub mod file;

use crate::Schedule;
use crate::errors::ScheduleError;
use std::io;
use thiserror::Error;

pub use file::{JsonFileStore, load_schedule_from_json, save_schedule_to_json};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid schedule: {0}")]
    Schedule(#[from] ScheduleError),
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

pub trait ScheduleStore {
    fn save_schedule(&self, schedule: &Schedule) -> PersistenceResult<()>;
    fn load_schedule(&self) -> PersistenceResult<Option<Schedule>>;
}
