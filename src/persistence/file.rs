use super::{PersistenceResult, ScheduleStore};
use crate::Schedule;
use crate::snapshot::ScheduleSnapshot;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

pub fn save_schedule_to_json<P: AsRef<Path>>(schedule: &Schedule, path: P) -> PersistenceResult<()> {
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(file, &schedule.snapshot())?;
    debug!(path = %path.as_ref().display(), "schedule saved");
    Ok(())
}

pub fn load_schedule_from_json<P: AsRef<Path>>(path: P) -> PersistenceResult<Schedule> {
    let file = File::open(path.as_ref())?;
    let snapshot: ScheduleSnapshot = serde_json::from_reader(BufReader::new(file))?;
    debug!(path = %path.as_ref().display(), tasks = snapshot.tasks.len(), "snapshot read");
    Ok(Schedule::from_snapshot(snapshot)?)
}

/// Keeps one schedule as a pretty-printed JSON snapshot on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScheduleStore for JsonFileStore {
    fn save_schedule(&self, schedule: &Schedule) -> PersistenceResult<()> {
        save_schedule_to_json(schedule, &self.path)
    }

    fn load_schedule(&self) -> PersistenceResult<Option<Schedule>> {
        if !self.path.exists() {
            return Ok(None);
        }
        load_schedule_from_json(&self.path).map(Some)
    }
}
