use chrono::{Datelike, NaiveDate, Weekday};
use gantt_schedule::{
    CalendarEvent, CalendarEventType, DayMask, DayType, ImportMode, MoveDirection, WorkCalendar,
    WorkCalendarConfig,
};

fn d(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn default_calendar_weekends_not_working() {
    let cal = WorkCalendar::new();
    // 2025-01-11 is a Saturday, 2025-01-12 is a Sunday
    assert!(!cal.is_working_day(d(2025, 1, 11)));
    assert!(!cal.is_working_day(d(2025, 1, 12)));
    assert!(cal.is_working_day(d(2025, 1, 13)));

    let mask = cal.day_mask(d(2025, 1, 11));
    assert!(mask.contains(DayMask::WEEKEND));
    assert!(!mask.is_working());
    assert_eq!(cal.day_type(d(2025, 1, 11)), DayType::Weekend);
}

#[test]
fn holiday_blocks_a_weekday() {
    let mut cal = WorkCalendar::new();
    cal.add_holiday(d(2025, 1, 8), "Offsite");
    assert!(!cal.is_working_day(d(2025, 1, 8)));
    assert!(cal.day_mask(d(2025, 1, 8)).contains(DayMask::HOLIDAY));
    assert_eq!(cal.day_type(d(2025, 1, 8)), DayType::NonWorking);
    assert_eq!(cal.event_at(d(2025, 1, 8)).map(|e| e.title.as_str()), Some("Offsite"));
}

#[test]
fn recurring_working_day_opens_a_weekend() {
    let mut cal = WorkCalendar::new();
    cal.set_events(vec![CalendarEvent::working_day(d(2020, 1, 11), "Stocktake").yearly()]);
    // Saturday in 2025, Sunday in 2026
    assert!(cal.is_working_day(d(2025, 1, 11)));
    assert!(cal.is_working_day(d(2026, 1, 11)));
    let mask = cal.day_mask(d(2025, 1, 11));
    assert!(mask.contains(DayMask::WEEKEND) && mask.contains(DayMask::WORKING));
}

#[test]
fn one_off_event_beats_recurring_one() {
    let mut cal = WorkCalendar::new();
    cal.set_events(vec![
        CalendarEvent::working_day(d(2020, 1, 11), "Stocktake").yearly(),
        CalendarEvent::holiday(d(2025, 1, 11), "Cancelled"),
    ]);
    assert!(!cal.is_working_day(d(2025, 1, 11)));
    assert!(cal.is_working_day(d(2026, 1, 11)));
}

#[test]
fn first_event_for_a_date_wins() {
    let mut cal = WorkCalendar::new();
    cal.set_events(vec![
        CalendarEvent::holiday(d(2025, 1, 8), "first"),
        CalendarEvent::working_day(d(2025, 1, 8), "second"),
    ]);
    assert!(!cal.is_working_day(d(2025, 1, 8)));
    assert_eq!(cal.event_at(d(2025, 1, 8)).map(|e| e.kind), Some(CalendarEventType::Holiday));
}

#[test]
fn neutral_event_leaves_weekday_rules_alone() {
    let mut cal = WorkCalendar::new();
    cal.set_events(vec![
        CalendarEvent::new(d(2025, 1, 8), CalendarEventType::Neutral, "Reminder"),
        CalendarEvent::new(d(2025, 1, 11), CalendarEventType::Neutral, "Reminder"),
    ]);
    assert!(cal.is_working_day(d(2025, 1, 8)));
    assert!(!cal.is_working_day(d(2025, 1, 11)));
    assert!(cal.event_at(d(2025, 1, 8)).is_some());
}

#[test]
fn non_working_weekday_is_a_holiday() {
    let mut cal = WorkCalendar::new();
    cal.set_weekday_type(Weekday::Wed, DayType::NonWorking);
    let mask = cal.day_mask(d(2025, 1, 8));
    assert!(mask.contains(DayMask::HOLIDAY));
    assert!(!mask.contains(DayMask::WEEKEND));
    assert_eq!(cal.day_type(d(2025, 1, 8)), DayType::NonWorking);
}

#[test]
fn only_show_weekends_makes_weekends_working() {
    let mut cal = WorkCalendar::new();
    cal.set_only_show_weekends(true);
    assert!(cal.is_working_day(d(2025, 1, 11)));
    cal.add_holiday(d(2025, 1, 12), "Closed");
    assert!(!cal.is_working_day(d(2025, 1, 12)));
}

#[test]
fn closest_working_day_in_both_directions() {
    let cal = WorkCalendar::new();
    let sat = d(2025, 1, 11);
    assert_eq!(cal.find_closest_working_day(sat, MoveDirection::Forward), Some(d(2025, 1, 13)));
    assert_eq!(cal.find_closest_working_day(sat, MoveDirection::Backward), Some(d(2025, 1, 10)));
    assert_eq!(cal.find_closest_working_day(d(2025, 1, 8), MoveDirection::Forward), Some(d(2025, 1, 8)));
}

#[test]
fn advance_returns_exclusive_end() {
    let cal = WorkCalendar::new();
    // Mon..Fri is five working days, end is the Saturday after
    assert_eq!(cal.advance(d(2025, 1, 6), 5), Some(d(2025, 1, 11)));
    // Fri + Mon
    assert_eq!(cal.advance(d(2025, 1, 10), 2), Some(d(2025, 1, 14)));
    assert_eq!(cal.advance(d(2025, 1, 10), 0), Some(d(2025, 1, 10)));
}

#[test]
fn retreat_walks_back_from_exclusive_end() {
    let cal = WorkCalendar::new();
    assert_eq!(cal.retreat(d(2025, 1, 11), 5), Some(d(2025, 1, 6)));
    assert_eq!(cal.retreat(d(2025, 1, 13), 1), Some(d(2025, 1, 10)));
}

#[test]
fn shift_date_skips_weekends() {
    let cal = WorkCalendar::new();
    assert_eq!(cal.shift_date(d(2025, 1, 10), 1), Some(d(2025, 1, 13)));
    assert_eq!(cal.shift_date(d(2025, 1, 13), -1), Some(d(2025, 1, 10)));
    assert_eq!(cal.shift_date(d(2025, 1, 6), 5), Some(d(2025, 1, 13)));
    assert_eq!(cal.shift_date(d(2025, 1, 8), 0), Some(d(2025, 1, 8)));
}

#[test]
fn calendar_without_working_time_gives_up() {
    let mut cal = WorkCalendar::new();
    for day in WorkCalendar::ALL_WEEKDAYS {
        cal.set_weekday_type(day, DayType::NonWorking);
    }
    assert!(!cal.has_working_time());
    assert_eq!(cal.find_closest_working_day(d(2025, 1, 6), MoveDirection::Forward), None);
    assert_eq!(cal.advance(d(2025, 1, 6), 1), None);
    assert_eq!(cal.retreat(d(2025, 1, 6), 1), None);
}

#[test]
fn activities_cover_the_whole_range() {
    let cal = WorkCalendar::new();
    let runs = cal.activities(d(2025, 1, 6), d(2025, 1, 15));
    assert_eq!(runs.len(), 3);
    assert_eq!(runs[0].start, d(2025, 1, 6));
    assert_eq!(runs[2].end, d(2025, 1, 15));
    assert_eq!(
        runs.iter().map(|run| run.working).collect::<Vec<_>>(),
        vec![true, false, true]
    );
}

#[test]
fn us_holidays_are_not_working() {
    let cal = WorkCalendar::with_us_holidays(2025, 2025);
    assert!(!cal.is_working_day(d(2025, 7, 4)));
    assert!(!cal.is_working_day(d(2025, 11, 27)));
    assert!(!cal.is_working_day(d(2025, 1, 20)));
    assert!(cal.is_working_day(d(2025, 1, 21)));
    let thanksgiving = d(2025, 11, 27);
    assert_eq!(thanksgiving.weekday(), Weekday::Thu);
}

#[test]
fn merge_import_keeps_weekdays_and_adds_events() {
    let mut cal = WorkCalendar::new();
    let mut other = WorkCalendar::continuous();
    other.add_holiday(d(2025, 1, 9), "Imported");

    cal.import_calendar(&other, ImportMode::Merge);
    assert!(!cal.is_working_day(d(2025, 1, 11)));
    assert!(!cal.is_working_day(d(2025, 1, 9)));

    cal.import_calendar(&other, ImportMode::Replace);
    assert!(cal.is_working_day(d(2025, 1, 11)));
    assert_eq!(cal.events().len(), 1);
}

#[test]
fn merge_import_adds_weekends_and_skips_known_events() {
    let mut cal = WorkCalendar::new();
    cal.add_holiday(d(2025, 1, 8), "Offsite");
    let mut other = WorkCalendar::new();
    other.set_weekday_type(Weekday::Fri, DayType::Weekend);
    other.set_events(vec![
        CalendarEvent::holiday(d(2025, 1, 8), "Offsite again"),
        CalendarEvent::holiday(d(2024, 12, 25), "Christmas").yearly(),
    ]);

    cal.import_calendar(&other, ImportMode::Merge);
    assert_eq!(cal.weekday_type(Weekday::Fri), DayType::Weekend);
    assert_eq!(cal.weekday_type(Weekday::Thu), DayType::Working);
    assert!(!cal.is_working_day(d(2025, 1, 10)));
    assert_eq!(cal.events().len(), 2);
    assert_eq!(cal.event_at(d(2025, 1, 8)).map(|event| event.title.as_str()), Some("Offsite"));
    assert!(!cal.is_working_day(d(2025, 12, 25)));

    cal.import_calendar(&other, ImportMode::Merge);
    assert_eq!(cal.events().len(), 2);
}

#[test]
fn config_round_trips_through_json() {
    let mut cal = WorkCalendar::new();
    cal.set_weekday_type(Weekday::Fri, DayType::NonWorking);
    cal.set_events(vec![
        CalendarEvent::holiday(d(2025, 12, 25), "Christmas").yearly().with_color("#ff0000"),
        CalendarEvent::working_day(d(2025, 1, 11), "Catch-up"),
    ]);

    let json = serde_json::to_string(&cal).unwrap();
    let restored: WorkCalendar = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, cal);
    assert_eq!(restored.revision(), 0);
    assert_eq!(restored.weekday_type(Weekday::Fri), DayType::NonWorking);

    let config: WorkCalendarConfig = cal.to_config();
    assert_eq!(config.working_days, vec![Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu]);
    assert_eq!(config.weekend_days, vec![Weekday::Sat, Weekday::Sun]);
}
