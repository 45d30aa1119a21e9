use chrono::NaiveDate;
use gantt_schedule::{Constraint, Hardness, NewTask, Schedule, TaskId, TimeDuration};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn add_task(schedule: &mut Schedule, name: &str, days: f64, parent: Option<TaskId>) -> TaskId {
    let day = schedule.units().day().clone();
    let mut new_task = NewTask::named(name)
        .starting(d(2025, 1, 6))
        .lasting(TimeDuration::new(days, day));
    if let Some(parent) = parent {
        new_task = new_task.under(parent);
    }
    schedule.create_task(new_task).unwrap()
}

fn finish_start(schedule: &mut Schedule, dependee: TaskId, dependant: TaskId) {
    schedule
        .add_dependency(dependant, dependee, Constraint::finish_start(), Hardness::Strict)
        .unwrap();
}

/// A(2) -> B(1) -> D(2) and A(2) -> C(3) -> D(2), everything from Mon 2025-01-06.
fn diamond() -> (Schedule, [TaskId; 4]) {
    let mut s = Schedule::new();
    let a = add_task(&mut s, "A", 2.0, None);
    let b = add_task(&mut s, "B", 1.0, None);
    let c = add_task(&mut s, "C", 3.0, None);
    let dd = add_task(&mut s, "D", 2.0, None);
    finish_start(&mut s, a, b);
    finish_start(&mut s, a, c);
    finish_start(&mut s, b, dd);
    finish_start(&mut s, c, dd);
    (s, [a, b, c, dd])
}

#[test]
fn diamond_is_scheduled_after_the_longer_branch() {
    let (s, [_, b, c, dd]) = diamond();
    assert_eq!(s.task(b).unwrap().start(), d(2025, 1, 8));
    assert_eq!(s.task(c).unwrap().end(), d(2025, 1, 11));
    assert_eq!(s.task(dd).unwrap().start(), d(2025, 1, 13));
    assert_eq!(s.task(dd).unwrap().end(), d(2025, 1, 15));
    assert_eq!(s.project_end(), Some(d(2025, 1, 15)));
}

#[test]
fn diamond_critical_path_follows_longer_branch() {
    let (s, [a, b, c, dd]) = diamond();
    let path = s.critical_path();

    assert_eq!(path.chain(), vec![a, c, dd]);
    assert!(!path.is_critical(b));
    assert_eq!(path.total_float(b), Some(2));
    assert_eq!(path.total_float(c), Some(0));
    assert_eq!(path.project_finish(), Some(d(2025, 1, 15)));

    let node = path.node(b).unwrap();
    assert_eq!(node.earliest_finish, d(2025, 1, 9));
    assert_eq!(node.latest_finish, d(2025, 1, 13));
    assert_eq!(node.latest_start, d(2025, 1, 10));
}

#[test]
fn unconnected_short_task_has_slack_to_project_end() {
    let (mut s, _) = diamond();
    let e = add_task(&mut s, "E", 1.0, None);
    // Tue 7th up to the exclusive project end Wed 15th
    assert_eq!(s.critical_path().total_float(e), Some(6));
    assert!(!s.is_critical(e));
}

#[test]
fn lengthening_a_branch_moves_the_critical_path() {
    let (mut s, [a, b, c, dd]) = diamond();
    let day = s.units().day().clone();
    s.set_duration(b, TimeDuration::new(4.0, day)).unwrap();

    assert_eq!(s.task(dd).unwrap().start(), d(2025, 1, 14));
    assert_eq!(s.critical_path().chain(), vec![a, b, dd]);
    assert_eq!(s.critical_path().total_float(c), Some(1));
}

#[test]
fn summary_is_critical_through_its_children() {
    let mut s = Schedule::new();
    let phase = add_task(&mut s, "Phase", 1.0, None);
    let x = add_task(&mut s, "X", 3.0, Some(phase));
    let y = add_task(&mut s, "Y", 1.0, Some(phase));

    assert!(s.is_critical(x));
    assert!(!s.is_critical(y));
    assert_eq!(s.critical_path().total_float(y), Some(2));
    assert!(s.is_critical(phase));
    assert_eq!(s.critical_path().total_float(phase), Some(0));
    assert_eq!(s.critical_tasks().into_iter().collect::<Vec<_>>(), vec![phase, x]);
}

#[test]
fn dependency_on_a_summary_reaches_its_leaves() {
    let mut s = Schedule::new();
    let phase = add_task(&mut s, "Phase", 1.0, None);
    let x = add_task(&mut s, "X", 3.0, Some(phase));
    let y = add_task(&mut s, "Y", 1.0, Some(phase));
    let after = add_task(&mut s, "After", 1.0, None);
    finish_start(&mut s, phase, after);

    assert_eq!(s.task(after).unwrap().start(), d(2025, 1, 9));
    assert!(s.is_critical(x));
    assert!(s.is_critical(after));
    assert!(!s.is_critical(y));
}

#[test]
fn empty_schedule_has_no_critical_path() {
    let s = Schedule::new();
    assert!(s.critical_tasks().is_empty());
    assert_eq!(s.critical_path().project_finish(), None);
}
