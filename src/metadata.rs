use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleMetadata {
    pub project_name: String,
    pub project_description: String,
    /// Default start for tasks created without one.
    pub project_start_date: NaiveDate,
}

impl Default for ScheduleMetadata {
    fn default() -> Self {
        Self {
            project_name: "New Project".to_string(),
            project_description: "No description".to_string(),
            project_start_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerOptions {
    /// Upper bound on worklist pops in one recalculation, and on
    /// recalculate/adjust rounds in one mutation.
    pub iteration_cap: usize,
}

impl SchedulerOptions {
    pub const DEFAULT_ITERATION_CAP: usize = 100_000;
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            iteration_cap: Self::DEFAULT_ITERATION_CAP,
        }
    }
}
