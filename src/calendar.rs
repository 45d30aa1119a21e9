use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::BitOr;

/// Longest run of consecutive non-working days a date search will walk
/// before giving up (roughly ten years).
pub const MAX_NON_WORKING_RUN: i64 = 3660;

/// How a weekday behaves when no calendar event overrides it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DayType {
    Working,
    Weekend,
    NonWorking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarEventType {
    Holiday,
    WorkingDay,
    Neutral,
}

/// A dated override. Recurring events match the same month and day every year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub date: NaiveDate,
    #[serde(default)]
    pub recurring: bool,
    pub kind: CalendarEventType,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl CalendarEvent {
    pub fn new(date: NaiveDate, kind: CalendarEventType, title: impl Into<String>) -> Self {
        Self {
            date,
            recurring: false,
            kind,
            title: title.into(),
            color: None,
        }
    }

    pub fn holiday(date: NaiveDate, title: impl Into<String>) -> Self {
        Self::new(date, CalendarEventType::Holiday, title)
    }

    pub fn working_day(date: NaiveDate, title: impl Into<String>) -> Self {
        Self::new(date, CalendarEventType::WorkingDay, title)
    }

    pub fn yearly(mut self) -> Self {
        self.recurring = true;
        self
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Bit set describing a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DayMask(u8);

impl DayMask {
    pub const WORKING: DayMask = DayMask(1);
    pub const WEEKEND: DayMask = DayMask(2);
    pub const HOLIDAY: DayMask = DayMask(4);

    pub fn empty() -> Self {
        DayMask(0)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn contains(self, other: DayMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_working(self) -> bool {
        self.contains(DayMask::WORKING)
    }
}

impl BitOr for DayMask {
    type Output = DayMask;

    fn bitor(self, rhs: DayMask) -> DayMask {
        DayMask(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    Forward,
    Backward,
}

/// A maximal run of days with the same working status inside a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarActivity {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub working: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportMode {
    /// Discard existing events and weekday types, take the other calendar's.
    Replace,
    /// Keep existing events and append the other calendar's events.
    Merge,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkCalendarConfig {
    pub working_days: Vec<Weekday>,
    pub weekend_days: Vec<Weekday>,
    #[serde(default)]
    pub only_show_weekends: bool,
    #[serde(default)]
    pub events: Vec<CalendarEvent>,
}

impl WorkCalendarConfig {
    pub fn new<I, J>(working_days: I, events: J) -> Self
    where
        I: IntoIterator<Item = Weekday>,
        J: IntoIterator<Item = CalendarEvent>,
    {
        let working_days: Vec<Weekday> = working_days.into_iter().collect();
        let weekend_days = WorkCalendar::ALL_WEEKDAYS
            .into_iter()
            .filter(|day| !working_days.contains(day))
            .collect();
        Self {
            working_days,
            weekend_days,
            only_show_weekends: false,
            events: events.into_iter().collect(),
        }
    }
}

impl Default for WorkCalendarConfig {
    fn default() -> Self {
        WorkCalendar::new().to_config()
    }
}

/// Working-day calendar: weekday types plus one-off and yearly events.
///
/// Every mutation bumps `revision`, which caches keyed on calendar state
/// compare against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "WorkCalendarConfig", into = "WorkCalendarConfig")]
pub struct WorkCalendar {
    weekday_types: [DayType; 7],
    only_show_weekends: bool,
    events: Vec<CalendarEvent>,
    one_off: HashMap<NaiveDate, usize>,
    recurring: HashMap<(u32, u32), usize>,
    revision: u64,
}

impl Default for WorkCalendar {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkCalendar {
    pub const ALL_WEEKDAYS: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    /// Monday to Friday working, Saturday and Sunday weekend, no events.
    pub fn new() -> Self {
        let mut weekday_types = [DayType::Working; 7];
        weekday_types[Weekday::Sat.num_days_from_monday() as usize] = DayType::Weekend;
        weekday_types[Weekday::Sun.num_days_from_monday() as usize] = DayType::Weekend;
        Self {
            weekday_types,
            only_show_weekends: false,
            events: Vec::new(),
            one_off: HashMap::new(),
            recurring: HashMap::new(),
            revision: 0,
        }
    }

    /// Every day of the week is a working day.
    pub fn continuous() -> Self {
        let mut calendar = Self::new();
        calendar.weekday_types = [DayType::Working; 7];
        calendar
    }

    /// Standard calendar plus US federal holidays for the inclusive year range.
    pub fn with_us_holidays(start_year: i32, end_year: i32) -> Self {
        let (start, end) = if start_year <= end_year {
            (start_year, end_year)
        } else {
            (end_year, start_year)
        };
        let mut calendar = Self::new();
        let events: Vec<CalendarEvent> = (start..=end).flat_map(us_holidays).collect();
        calendar.set_events(events);
        calendar
    }

    pub fn from_config(config: &WorkCalendarConfig) -> Self {
        let mut calendar = Self::new();
        for day in Self::ALL_WEEKDAYS {
            let day_type = if config.working_days.contains(&day) {
                DayType::Working
            } else if config.weekend_days.contains(&day) {
                DayType::Weekend
            } else {
                DayType::NonWorking
            };
            calendar.weekday_types[day.num_days_from_monday() as usize] = day_type;
        }
        calendar.only_show_weekends = config.only_show_weekends;
        calendar.set_events(config.events.iter().cloned());
        calendar.revision = 0;
        calendar
    }

    pub fn to_config(&self) -> WorkCalendarConfig {
        WorkCalendarConfig::from(self)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn weekday_type(&self, day: Weekday) -> DayType {
        self.weekday_types[day.num_days_from_monday() as usize]
    }

    pub fn set_weekday_type(&mut self, day: Weekday, day_type: DayType) {
        self.weekday_types[day.num_days_from_monday() as usize] = day_type;
        self.touch();
    }

    pub fn only_show_weekends(&self) -> bool {
        self.only_show_weekends
    }

    /// When set, weekend days count as working time.
    pub fn set_only_show_weekends(&mut self, value: bool) {
        self.only_show_weekends = value;
        self.touch();
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    /// Replaces the whole event list. For duplicate dates the earliest
    /// supplied event wins.
    pub fn set_events<I>(&mut self, events: I)
    where
        I: IntoIterator<Item = CalendarEvent>,
    {
        self.events = events.into_iter().collect();
        self.reindex();
        self.touch();
    }

    /// Appends a one-off holiday. Ignored for lookup if the date already
    /// carries a one-off event.
    pub fn add_holiday(&mut self, date: NaiveDate, title: impl Into<String>) {
        self.events.push(CalendarEvent::holiday(date, title));
        self.reindex();
        self.touch();
    }

    /// `Replace` copies weekday types and events. `Merge` adds the other
    /// calendar's weekend days and any event whose date is not taken yet.
    pub fn import_calendar(&mut self, other: &WorkCalendar, mode: ImportMode) {
        match mode {
            ImportMode::Replace => {
                self.weekday_types = other.weekday_types;
                self.only_show_weekends = other.only_show_weekends;
                self.events = other.events.clone();
            }
            ImportMode::Merge => {
                for (slot, other_type) in self.weekday_types.iter_mut().zip(other.weekday_types) {
                    if other_type == DayType::Weekend {
                        *slot = DayType::Weekend;
                    }
                }
                for event in &other.events {
                    let present = self.events.iter().any(|existing| {
                        existing.recurring == event.recurring
                            && if event.recurring {
                                (existing.date.month(), existing.date.day())
                                    == (event.date.month(), event.date.day())
                            } else {
                                existing.date == event.date
                            }
                    });
                    if !present {
                        self.events.push(event.clone());
                    }
                }
            }
        }
        self.reindex();
        self.touch();
    }

    /// The event governing `date`: a one-off event on that exact date,
    /// otherwise a yearly event on the same month and day.
    pub fn event_at(&self, date: NaiveDate) -> Option<&CalendarEvent> {
        self.one_off
            .get(&date)
            .or_else(|| self.recurring.get(&(date.month(), date.day())))
            .map(|&index| &self.events[index])
    }

    pub fn day_mask(&self, date: NaiveDate) -> DayMask {
        let weekday_type = self.weekday_type(date.weekday());
        let mut mask = DayMask::empty();
        if weekday_type == DayType::Weekend {
            mask = mask | DayMask::WEEKEND;
        }
        match self.holiday_override(date) {
            Some(CalendarEventType::Holiday) => return mask | DayMask::HOLIDAY,
            Some(CalendarEventType::WorkingDay) => return mask | DayMask::WORKING,
            _ => {}
        }
        match weekday_type {
            DayType::Working => mask | DayMask::WORKING,
            DayType::Weekend if self.only_show_weekends => mask | DayMask::WORKING,
            DayType::Weekend => mask,
            DayType::NonWorking => mask | DayMask::HOLIDAY,
        }
    }

    pub fn day_type(&self, date: NaiveDate) -> DayType {
        let mask = self.day_mask(date);
        if mask.is_working() {
            DayType::Working
        } else if mask.contains(DayMask::WEEKEND) && !mask.contains(DayMask::HOLIDAY) {
            DayType::Weekend
        } else {
            DayType::NonWorking
        }
    }

    pub fn is_working_day(&self, date: NaiveDate) -> bool {
        self.day_mask(date).is_working()
    }

    /// Whether any date at all can be a working day.
    pub fn has_working_time(&self) -> bool {
        self.weekday_types.iter().any(|day_type| match day_type {
            DayType::Working => true,
            DayType::Weekend => self.only_show_weekends,
            DayType::NonWorking => false,
        }) || self
            .events
            .iter()
            .any(|event| event.kind == CalendarEventType::WorkingDay)
    }

    /// `date` itself if it is working, otherwise the nearest working day in
    /// `direction`. `None` if no working day exists within the search limit.
    pub fn find_closest_working_day(&self, date: NaiveDate, direction: MoveDirection) -> Option<NaiveDate> {
        let step = match direction {
            MoveDirection::Forward => Duration::days(1),
            MoveDirection::Backward => Duration::days(-1),
        };
        let mut current = date;
        for _ in 0..=MAX_NON_WORKING_RUN {
            if self.is_working_day(current) {
                return Some(current);
            }
            current = current.checked_add_signed(step)?;
        }
        None
    }

    /// Exclusive end of a span of `working_days` working days beginning at
    /// `start`: the day after the last of them. Zero returns `start`.
    pub fn advance(&self, start: NaiveDate, working_days: i64) -> Option<NaiveDate> {
        if working_days <= 0 {
            return Some(start);
        }
        let mut current = start;
        let mut counted = 0;
        let mut idle = 0;
        loop {
            if self.is_working_day(current) {
                counted += 1;
                idle = 0;
                if counted == working_days {
                    return current.succ_opt();
                }
            } else {
                idle += 1;
                if idle > MAX_NON_WORKING_RUN {
                    return None;
                }
            }
            current = current.succ_opt()?;
        }
    }

    /// Start of a span of `working_days` working days that ends just before
    /// `end`: walks backwards and returns the n-th working day found.
    pub fn retreat(&self, end: NaiveDate, working_days: i64) -> Option<NaiveDate> {
        if working_days <= 0 {
            return Some(end);
        }
        let mut current = end;
        let mut counted = 0;
        let mut idle = 0;
        loop {
            current = current.pred_opt()?;
            if self.is_working_day(current) {
                counted += 1;
                idle = 0;
                if counted == working_days {
                    return Some(current);
                }
            } else {
                idle += 1;
                if idle > MAX_NON_WORKING_RUN {
                    return None;
                }
            }
        }
    }

    /// Moves `date` by a signed number of working days. Positive offsets land
    /// on a working day `offset` working days later, negative ones on the
    /// working day `-offset` working days earlier.
    pub fn shift_date(&self, date: NaiveDate, offset: i64) -> Option<NaiveDate> {
        match offset {
            0 => Some(date),
            n if n > 0 => {
                let after = self.advance(date, n)?;
                self.find_closest_working_day(after, MoveDirection::Forward)
            }
            n => self.retreat(date, -n),
        }
    }

    /// Splits `[start, end)` into alternating working and non-working runs.
    pub fn activities(&self, start: NaiveDate, end: NaiveDate) -> Vec<CalendarActivity> {
        let mut result: Vec<CalendarActivity> = Vec::new();
        let mut current = start;
        while current < end {
            let working = self.is_working_day(current);
            let next = current + Duration::days(1);
            match result.last_mut() {
                Some(last) if last.working == working => last.end = next,
                _ => result.push(CalendarActivity {
                    start: current,
                    end: next,
                    working,
                }),
            }
            current = next;
        }
        result
    }

    fn holiday_override(&self, date: NaiveDate) -> Option<CalendarEventType> {
        let one_off = self
            .one_off
            .get(&date)
            .map(|&index| self.events[index].kind)
            .filter(|kind| *kind != CalendarEventType::Neutral);
        one_off.or_else(|| {
            self.recurring
                .get(&(date.month(), date.day()))
                .map(|&index| self.events[index].kind)
                .filter(|kind| *kind != CalendarEventType::Neutral)
        })
    }

    fn reindex(&mut self) {
        self.one_off.clear();
        self.recurring.clear();
        for (index, event) in self.events.iter().enumerate() {
            if event.recurring {
                self.recurring
                    .entry((event.date.month(), event.date.day()))
                    .or_insert(index);
            } else {
                self.one_off.entry(event.date).or_insert(index);
            }
        }
    }

    fn touch(&mut self) {
        self.revision += 1;
    }
}

impl PartialEq for WorkCalendar {
    fn eq(&self, other: &Self) -> bool {
        self.weekday_types == other.weekday_types
            && self.only_show_weekends == other.only_show_weekends
            && self.events == other.events
    }
}

impl From<&WorkCalendar> for WorkCalendarConfig {
    fn from(calendar: &WorkCalendar) -> Self {
        let by_type = |wanted: DayType| {
            WorkCalendar::ALL_WEEKDAYS
                .into_iter()
                .filter(|day| calendar.weekday_type(*day) == wanted)
                .collect()
        };
        Self {
            working_days: by_type(DayType::Working),
            weekend_days: by_type(DayType::Weekend),
            only_show_weekends: calendar.only_show_weekends,
            events: calendar.events.clone(),
        }
    }
}

impl From<WorkCalendar> for WorkCalendarConfig {
    fn from(calendar: WorkCalendar) -> Self {
        WorkCalendarConfig::from(&calendar)
    }
}

impl From<WorkCalendarConfig> for WorkCalendar {
    fn from(config: WorkCalendarConfig) -> Self {
        WorkCalendar::from_config(&config)
    }
}

/// Standard US federal holidays for a given year.
fn us_holidays(year: i32) -> Vec<CalendarEvent> {
    let fixed = |month, day| NaiveDate::from_ymd_opt(year, month, day);
    [
        (fixed(1, 1), "New Year's Day"),
        (nth_weekday(year, 1, Weekday::Mon, 3), "Martin Luther King Jr. Day"),
        (nth_weekday(year, 2, Weekday::Mon, 3), "Presidents' Day"),
        (last_weekday(year, 5, Weekday::Mon), "Memorial Day"),
        (fixed(7, 4), "Independence Day"),
        (nth_weekday(year, 9, Weekday::Mon, 1), "Labor Day"),
        (nth_weekday(year, 10, Weekday::Mon, 2), "Columbus Day"),
        (fixed(11, 11), "Veterans Day"),
        (nth_weekday(year, 11, Weekday::Thu, 4), "Thanksgiving"),
        (fixed(12, 25), "Christmas"),
    ]
    .into_iter()
    .filter_map(|(date, title)| date.map(|date| CalendarEvent::holiday(date, title)))
    .collect()
}

/// The nth occurrence of a weekday in a month.
fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}

/// The last occurrence of a weekday in a month.
fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let mut date = first_of_next.pred_opt()?;
    while date.weekday() != weekday {
        date = date.pred_opt()?;
    }
    Some(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn memorial_day_is_last_monday_of_may() {
        assert_eq!(last_weekday(2025, 5, Weekday::Mon), Some(d(2025, 5, 26)));
        assert_eq!(last_weekday(2024, 12, Weekday::Tue), Some(d(2024, 12, 31)));
    }

    #[test]
    fn activities_merge_adjacent_days() {
        let calendar = WorkCalendar::new();
        // Fri 2025-01-10 .. Tue 2025-01-14
        let runs = calendar.activities(d(2025, 1, 10), d(2025, 1, 14));
        assert_eq!(
            runs,
            vec![
                CalendarActivity { start: d(2025, 1, 10), end: d(2025, 1, 11), working: true },
                CalendarActivity { start: d(2025, 1, 11), end: d(2025, 1, 13), working: false },
                CalendarActivity { start: d(2025, 1, 13), end: d(2025, 1, 14), working: true },
            ]
        );
    }

    #[test]
    fn revision_moves_on_every_change() {
        let mut calendar = WorkCalendar::new();
        let before = calendar.revision();
        calendar.set_weekday_type(Weekday::Sat, DayType::Working);
        calendar.set_only_show_weekends(true);
        assert_eq!(calendar.revision(), before + 2);
    }
}
