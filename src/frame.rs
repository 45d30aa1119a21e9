use chrono::NaiveDate;
use polars::prelude::PlSmallStr;
use polars::prelude::*;

use crate::Schedule;

fn date_to_i32(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    (date - epoch).num_days() as i32
}

fn date_column(name: &'static str, dates: Vec<i32>) -> PolarsResult<Column> {
    Ok(Column::from(
        Series::new(PlSmallStr::from_static(name), dates).cast(&DataType::Date)?,
    ))
}

impl Schedule {
    /// One row per task in hierarchy order. Dates are `Date` columns with
    /// `end` exclusive; `predecessors` lists dependee ids.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let tasks: Vec<_> = self.tasks().collect();

        let ids: Vec<i32> = tasks.iter().map(|task| task.id().0 as i32).collect();
        let names: Vec<String> = tasks.iter().map(|task| task.name().to_string()).collect();
        let parents: Vec<Option<i32>> = tasks
            .iter()
            .map(|task| task.parent().map(|parent| parent.0 as i32))
            .collect();
        let starts: Vec<i32> = tasks.iter().map(|task| date_to_i32(task.start())).collect();
        let ends: Vec<i32> = tasks.iter().map(|task| date_to_i32(task.end())).collect();
        let durations: Vec<i64> = tasks.iter().map(|task| task.working_days()).collect();
        let completion: Vec<i32> = tasks.iter().map(|task| i32::from(task.completion())).collect();
        let milestones: Vec<bool> = tasks.iter().map(|task| task.is_milestone()).collect();
        let critical: Vec<bool> = tasks.iter().map(|task| self.is_critical(task.id())).collect();
        let floats: Vec<Option<i64>> = tasks
            .iter()
            .map(|task| self.critical_path().total_float(task.id()))
            .collect();

        let predecessor_rows: Vec<Series> = tasks
            .iter()
            .map(|task| {
                let mut list: Vec<i32> = self
                    .dependencies_as_dependant(task.id())
                    .into_iter()
                    .map(|dep| dep.dependee.0 as i32)
                    .collect();
                list.sort_unstable();
                list.dedup();
                Series::new(PlSmallStr::from_static(""), list)
            })
            .collect();
        let mut predecessors: ListChunked = predecessor_rows.into_iter().collect();
        predecessors.rename(PlSmallStr::from_static("predecessors"));

        DataFrame::new(vec![
            Column::from(Series::new(PlSmallStr::from_static("id"), ids)),
            Column::from(Series::new(PlSmallStr::from_static("name"), names)),
            Column::from(Series::new(PlSmallStr::from_static("parent_id"), parents)),
            date_column("start", starts)?,
            date_column("end", ends)?,
            Column::from(Series::new(PlSmallStr::from_static("duration_days"), durations)),
            Column::from(Series::new(PlSmallStr::from_static("completion"), completion)),
            Column::from(Series::new(PlSmallStr::from_static("milestone"), milestones)),
            Column::from(predecessors.into_series()),
            Column::from(Series::new(PlSmallStr::from_static("is_critical"), critical)),
            Column::from(Series::new(PlSmallStr::from_static("total_float"), floats)),
        ])
    }
}
