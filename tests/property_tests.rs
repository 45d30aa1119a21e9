use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};
use gantt_schedule::{
    Constraint, Hardness, MoveDirection, NewTask, Schedule, TaskId, TimeDuration, WorkCalendar,
    WorkingUnitCounter,
};
use proptest::prelude::*;

fn base() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
}

// Tasks as (start offset in days, working days); edges only point from a
// lower index to a higher one, so the plan is always acyclic.
fn plan_strategy(max_tasks: usize) -> impl Strategy<Value = (Vec<(i64, i64)>, Vec<(usize, usize)>)> {
    (2..=max_tasks).prop_flat_map(|num_tasks| {
        let tasks = proptest::collection::vec((0..20i64, 1..6i64), num_tasks);
        let edges = proptest::collection::vec((any::<usize>(), any::<usize>()), 0..num_tasks * 2);
        (tasks, edges).prop_map(move |(tasks, raw_edges)| {
            let mut edges = BTreeSet::new();
            for (a, b) in raw_edges {
                let (a, b) = (a % num_tasks, b % num_tasks);
                if a < b {
                    edges.insert((a, b));
                }
            }
            (tasks, edges.into_iter().collect())
        })
    })
}

fn build(tasks: &[(i64, i64)], edges: &[(usize, usize)]) -> (Schedule, Vec<TaskId>) {
    let mut schedule = Schedule::new();
    let day = schedule.units().day().clone();
    let ids: Vec<TaskId> = tasks
        .iter()
        .enumerate()
        .map(|(i, (offset, days))| {
            schedule
                .create_task(
                    NewTask::named(format!("task_{i}"))
                        .starting(base() + Duration::days(*offset))
                        .lasting(TimeDuration::new(*days as f64, day.clone())),
                )
                .unwrap()
        })
        .collect();
    for (dependee, dependant) in edges {
        schedule
            .add_dependency(ids[*dependant], ids[*dependee], Constraint::finish_start(), Hardness::Strict)
            .unwrap();
    }
    (schedule, ids)
}

proptest! {
    #[test]
    fn advance_and_retreat_are_inverse(offset in 0..60i64, n in 1..40i64) {
        let calendar = WorkCalendar::new();
        let start = calendar
            .find_closest_working_day(base() + Duration::days(offset), MoveDirection::Forward)
            .unwrap();
        let end = calendar.advance(start, n).unwrap();
        prop_assert_eq!(calendar.retreat(end, n), Some(start));
        prop_assert_eq!(WorkingUnitCounter::new().working_days(&calendar, start, end).unwrap(), n);
    }

    #[test]
    fn shifted_dates_land_on_working_days(offset in 0..60i64, shift in -30..30i64) {
        let calendar = WorkCalendar::new();
        let date = base() + Duration::days(offset);
        let shifted = calendar.shift_date(date, shift).unwrap();
        if shift != 0 {
            prop_assert!(calendar.is_working_day(shifted));
        }
    }

    #[test]
    fn finish_start_dependencies_hold_after_any_plan((tasks, edges) in plan_strategy(8)) {
        let (schedule, ids) = build(&tasks, &edges);
        prop_assert!(schedule.last_report().converged());
        for (dependee, dependant) in &edges {
            let before = schedule.task(ids[*dependee]).unwrap();
            let after = schedule.task(ids[*dependant]).unwrap();
            prop_assert!(after.start() >= before.end());
            prop_assert!(schedule.calendar().is_working_day(after.start()));
        }
        for id in &ids {
            let task = schedule.task(*id).unwrap();
            prop_assert_eq!(
                schedule.calendar().advance(task.start(), task.working_days()),
                Some(task.end())
            );
        }
    }

    #[test]
    fn recalculating_a_settled_plan_changes_nothing((tasks, edges) in plan_strategy(8)) {
        let (mut schedule, _) = build(&tasks, &edges);
        schedule.recalculate_all();
        let settled = schedule.snapshot();
        let second = schedule.recalculate_all();
        prop_assert!(second.is_empty(), "second pass moved tasks: {:?}", second.changes);
        prop_assert_eq!(schedule.snapshot(), settled);
    }

    #[test]
    fn critical_path_floats_are_never_negative((tasks, edges) in plan_strategy(8)) {
        let (schedule, ids) = build(&tasks, &edges);
        prop_assert!(!schedule.critical_tasks().is_empty());
        for id in &ids {
            let float = schedule.critical_path().total_float(*id).unwrap();
            prop_assert!(float >= 0);
            prop_assert_eq!(schedule.is_critical(*id), float == 0);
        }
    }

    #[test]
    fn summary_envelopes_its_children(children in proptest::collection::vec((0..20i64, 1..6i64), 1..6)) {
        let mut schedule = Schedule::new();
        let day = schedule.units().day().clone();
        let parent = schedule.create_task(NewTask::named("parent").starting(base())).unwrap();
        for (offset, days) in &children {
            schedule
                .create_task(
                    NewTask::named("child")
                        .starting(base() + Duration::days(*offset))
                        .lasting(TimeDuration::new(*days as f64, day.clone()))
                        .under(parent),
                )
                .unwrap();
        }
        let summary = schedule.task(parent).unwrap();
        let kids: Vec<_> = summary.children().iter().map(|id| schedule.task(*id).unwrap()).collect();
        prop_assert_eq!(Some(summary.start()), kids.iter().map(|task| task.start()).min());
        prop_assert_eq!(Some(summary.end()), kids.iter().map(|task| task.end()).max());
    }
}
