use chrono::NaiveDate;
use gantt_schedule::{
    Constraint, Hardness, NewTask, Schedule, ScheduleError, TaskId, TimeDuration,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn days(schedule: &Schedule, n: f64) -> TimeDuration {
    TimeDuration::new(n, schedule.units().day().clone())
}

fn add_task(schedule: &mut Schedule, name: &str, start: NaiveDate, n: f64, parent: Option<TaskId>) -> TaskId {
    let mut new_task = NewTask::named(name).starting(start).lasting(days(schedule, n));
    if let Some(parent) = parent {
        new_task = new_task.under(parent);
    }
    schedule.create_task(new_task).unwrap()
}

fn span(schedule: &Schedule, id: TaskId) -> (NaiveDate, NaiveDate) {
    let task = schedule.task(id).unwrap();
    (task.start(), task.end())
}

/// Phase [Mon 6th, Sat 11th) holding C1 (Mon, 2 days) and C2 (Wed, 3 days).
fn phase() -> (Schedule, TaskId, TaskId, TaskId) {
    let mut s = Schedule::new();
    let p = add_task(&mut s, "Phase", d(2025, 1, 6), 1.0, None);
    let c1 = add_task(&mut s, "C1", d(2025, 1, 6), 2.0, Some(p));
    let c2 = add_task(&mut s, "C2", d(2025, 1, 8), 3.0, Some(p));
    (s, p, c1, c2)
}

#[test]
fn summary_spans_its_children() {
    let (s, p, _, _) = phase();
    let summary = s.task(p).unwrap();
    assert!(summary.is_summary());
    assert_eq!(span(&s, p), (d(2025, 1, 6), d(2025, 1, 11)));
    assert_eq!(summary.working_days(), 5);
    assert_eq!(summary.duration().length(), 5.0);
    assert_eq!(s.project_start(), Some(d(2025, 1, 6)));
}

#[test]
fn summary_completion_is_weighted_by_working_days() {
    let (mut s, p, c1, _) = phase();
    s.set_completion(c1, 100).unwrap();
    assert_eq!(s.task(p).unwrap().completion(), 40);
}

#[test]
fn summary_bounds_are_derived() {
    let (mut s, p, c1, _) = phase();
    assert!(matches!(s.set_completion(p, 50), Err(ScheduleError::DerivedBounds(_))));
    assert!(matches!(s.set_end(p, d(2025, 1, 20)), Err(ScheduleError::DerivedBounds(_))));
    assert!(matches!(s.set_duration(p, days(&s, 9.0)), Err(ScheduleError::DerivedBounds(_))));
    assert!(matches!(
        s.set_completion(c1, 101),
        Err(ScheduleError::InvalidCompletion { value: 101, .. })
    ));
}

#[test]
fn deleting_a_child_shrinks_the_parent() {
    let (mut s, p, _, c2) = phase();
    s.delete_task(c2).unwrap();
    assert_eq!(span(&s, p), (d(2025, 1, 6), d(2025, 1, 8)));
    assert!(s.task(c2).is_none());
}

#[test]
fn deleting_a_summary_removes_subtree_and_dependencies() {
    let (mut s, p, c1, c2) = phase();
    let after = add_task(&mut s, "After", d(2025, 1, 6), 1.0, None);
    s.add_dependency(after, c2, Constraint::finish_start(), Hardness::Strict)
        .unwrap();

    s.delete_task(p).unwrap();
    assert_eq!(s.task_count(), 1);
    assert!(s.task(c1).is_none());
    assert_eq!(s.dependencies().count(), 0);
    // ids are never reused
    let next = add_task(&mut s, "Next", d(2025, 1, 6), 1.0, None);
    assert_eq!(next, TaskId(4));
}

#[test]
fn moving_a_child_out_recomputes_old_parent() {
    let (mut s, p, _, c2) = phase();
    s.move_task(c2, None).unwrap();
    assert_eq!(s.task(c2).unwrap().parent(), None);
    assert_eq!(span(&s, p), (d(2025, 1, 6), d(2025, 1, 8)));
    assert_eq!(s.task_arena().roots(), &[p, c2]);
}

#[test]
fn task_cannot_become_its_own_ancestor() {
    let (mut s, p, c1, _) = phase();
    assert!(matches!(
        s.move_task(p, Some(c1)),
        Err(ScheduleError::ContainmentCycle { .. })
    ));
    assert!(matches!(
        s.move_task(p, Some(p)),
        Err(ScheduleError::ContainmentCycle { .. })
    ));
    assert_eq!(s.task(c1).unwrap().parent(), Some(p));
}

#[test]
fn dependencies_between_ancestor_and_descendant_are_rejected() {
    let (mut s, p, c1, _) = phase();
    assert!(matches!(
        s.add_dependency(c1, p, Constraint::finish_start(), Hardness::Strict),
        Err(ScheduleError::HierarchyConflict { .. })
    ));

    let x = add_task(&mut s, "X", d(2025, 1, 6), 1.0, None);
    s.add_dependency(x, c1, Constraint::finish_start(), Hardness::Strict)
        .unwrap();
    assert!(matches!(
        s.move_task(x, Some(c1)),
        Err(ScheduleError::HierarchyConflict { .. })
    ));
}

#[test]
fn implicit_cycle_through_a_summary_is_rejected() {
    let (mut s, p, c1, _) = phase();
    let x = add_task(&mut s, "X", d(2025, 1, 6), 1.0, None);
    s.add_dependency(x, c1, Constraint::finish_start(), Hardness::Strict)
        .unwrap();

    assert!(!s.can_create_dependency(p, x));
    assert!(matches!(
        s.add_dependency(p, x, Constraint::finish_start(), Hardness::Strict),
        Err(ScheduleError::DependencyCycle { .. })
    ));
    assert_eq!(s.dependencies().count(), 1);
}

#[test]
fn shifting_a_summary_moves_the_subtree() {
    let (mut s, p, c1, c2) = phase();
    let report = s.shift_task(p, &days(&s, 2.0)).unwrap();

    assert_eq!(span(&s, c1), (d(2025, 1, 8), d(2025, 1, 10)));
    assert_eq!(span(&s, c2), (d(2025, 1, 10), d(2025, 1, 15)));
    assert_eq!(span(&s, p), (d(2025, 1, 8), d(2025, 1, 15)));
    assert!(report.change_for(c2).is_some());
}

#[test]
fn shifting_back_and_by_weeks() {
    let mut s = Schedule::new();
    let t = add_task(&mut s, "T", d(2025, 1, 6), 2.0, None);
    s.shift_task(t, &days(&s, -1.0)).unwrap();
    assert_eq!(span(&s, t), (d(2025, 1, 3), d(2025, 1, 7)));

    let week = TimeDuration::new(1.0, s.units().week().clone());
    s.shift_task(t, &week).unwrap();
    assert_eq!(span(&s, t).0, d(2025, 1, 10));
}

#[test]
fn shift_before_earliest_begin_is_rejected_as_a_whole() {
    let (mut s, p, c1, c2) = phase();
    s.set_earliest_begin(c2, Some(d(2025, 1, 8))).unwrap();
    let before = (span(&s, p), span(&s, c1), span(&s, c2));

    let result = s.shift_task(p, &days(&s, -1.0));
    assert!(matches!(result, Err(ScheduleError::ShiftRejected(_))));
    assert_eq!((span(&s, p), span(&s, c1), span(&s, c2)), before);
}

#[test]
fn setting_summary_start_translates_children() {
    let (mut s, p, c1, c2) = phase();
    s.set_start(p, d(2025, 1, 13)).unwrap();
    assert_eq!(span(&s, c1), (d(2025, 1, 13), d(2025, 1, 15)));
    assert_eq!(span(&s, c2), (d(2025, 1, 15), d(2025, 1, 18)));
    assert_eq!(span(&s, p), (d(2025, 1, 13), d(2025, 1, 18)));
}

#[test]
fn weekend_start_is_moved_to_monday() {
    let mut s = Schedule::new();
    let t = add_task(&mut s, "T", d(2025, 1, 11), 1.0, None);
    assert_eq!(span(&s, t), (d(2025, 1, 13), d(2025, 1, 14)));
    s.set_start(t, d(2025, 1, 19)).unwrap();
    assert_eq!(span(&s, t).0, d(2025, 1, 20));
}

#[test]
fn week_and_month_durations_cover_their_calendar_span() {
    let mut s = Schedule::new();
    let weeks = TimeDuration::new(2.0, s.units().week().clone());
    let t = s
        .create_task(NewTask::named("Two weeks").starting(d(2025, 1, 6)).lasting(weeks))
        .unwrap();
    assert_eq!(s.task(t).unwrap().working_days(), 10);
    assert_eq!(span(&s, t).1, d(2025, 1, 18));
    assert_eq!(s.task(t).unwrap().duration().unit(), s.units().week());

    let month = TimeDuration::new(1.0, s.units().month().clone());
    let m = s
        .create_task(NewTask::named("January").starting(d(2025, 1, 1)).lasting(month))
        .unwrap();
    assert_eq!(s.task(m).unwrap().working_days(), 23);
    assert_eq!(span(&s, m).1, d(2025, 2, 1));
}

#[test]
fn set_end_derives_duration() {
    let mut s = Schedule::new();
    let t = add_task(&mut s, "T", d(2025, 1, 6), 1.0, None);
    s.set_end(t, d(2025, 1, 9)).unwrap();
    assert_eq!(s.task(t).unwrap().working_days(), 3);
    assert_eq!(span(&s, t).1, d(2025, 1, 9));
    assert!(matches!(
        s.set_end(t, d(2025, 1, 3)),
        Err(ScheduleError::InvalidDuration { .. })
    ));
}

#[test]
fn milestones_have_no_duration() {
    let mut s = Schedule::new();
    let t = add_task(&mut s, "T", d(2025, 1, 8), 3.0, None);
    s.set_milestone(t, true).unwrap();
    let task = s.task(t).unwrap();
    assert!(task.is_milestone());
    assert_eq!(task.start(), task.end());
    assert_eq!(task.working_days(), 0);

    assert!(matches!(
        s.set_duration(t, days(&s, 2.0)),
        Err(ScheduleError::InvalidDuration { .. })
    ));
    s.set_milestone(t, false).unwrap();
    assert_eq!(span(&s, t), (d(2025, 1, 8), d(2025, 1, 9)));
}

#[test]
fn invalid_inputs_are_rejected() {
    let mut s = Schedule::new();
    let t = add_task(&mut s, "T", d(2025, 1, 6), 1.0, None);
    assert!(matches!(
        s.set_duration(t, days(&s, -2.0)),
        Err(ScheduleError::InvalidDuration { .. })
    ));
    assert!(matches!(
        s.create_task(NewTask::named("orphan").under(TaskId(42))),
        Err(ScheduleError::UnknownTask(TaskId(42)))
    ));
    assert!(matches!(s.set_start(TaskId(42), d(2025, 1, 6)), Err(ScheduleError::UnknownTask(_))));
    assert_eq!(s.task_count(), 1);
}

#[test]
fn durations_and_shifts_beyond_the_date_range_are_rejected() {
    let mut s = Schedule::new();
    let t = add_task(&mut s, "T", d(2025, 1, 6), 2.0, None);
    let week = s.units().week().clone();

    assert!(matches!(
        s.set_duration(t, TimeDuration::new(1e9, week.clone())),
        Err(ScheduleError::InvalidDuration { .. })
    ));
    assert!(matches!(
        s.shift_task(t, &TimeDuration::new(-1e9, week)),
        Err(ScheduleError::InvalidDuration { .. })
    ));
    assert!(matches!(
        s.shift_task(t, &days(&s, 1e12)),
        Err(ScheduleError::InvalidDuration { .. })
    ));
    assert_eq!(span(&s, t), (d(2025, 1, 6), d(2025, 1, 8)));
}
