// src/calendar.rs
use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::error::{WorkdayError, WorkdayResult};
use crate::records::{Holiday, LeaveRequest, PersonId};

pub const SUNDAY_HOLIDAY_NAME: &str = "Sunday";

/// Enumerates every calendar day in `[start, end]`. Empty when `end < start`.
pub(crate) fn days_inclusive(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day <= end)
}

/// Holidays and approved leave, flattened to per-date sets.
///
/// Built from a snapshot of store records and never mutated afterwards; callers
/// rebuild it whenever holidays or leave requests change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalendarIndex {
    holiday_dates: HashSet<NaiveDate>,
    leave_dates_by_person: HashMap<PersonId, HashSet<NaiveDate>>,
}

impl CalendarIndex {
    pub fn build(holidays: &[Holiday], leave_requests: &[LeaveRequest]) -> Self {
        let mut index = Self::default();

        for holiday in holidays {
            match holiday.calendar_date() {
                Ok(date) => {
                    index.holiday_dates.insert(date);
                }
                Err(e) => warn!("Skipping holiday record: {}", e),
            }
        }

        for leave in leave_requests.iter().filter(|l| l.is_approved()) {
            let range = leave.start().and_then(|start| leave.end().map(|end| (start, end)));
            let (start, end) = match range {
                Ok(range) => range,
                Err(e) => {
                    warn!("Skipping leave record: {}", e);
                    continue;
                }
            };
            if end < start {
                warn!(
                    "Approved leave {} for {} ends ({}) before it starts ({}), contributes no days",
                    leave.id, leave.user_id, end, start
                );
                continue;
            }
            index
                .leave_dates_by_person
                .entry(leave.user_id.clone())
                .or_default()
                .extend(days_inclusive(start, end));
        }

        debug!(
            "Calendar index built: {} holiday dates, {} people with approved leave",
            index.holiday_dates.len(),
            index.leave_dates_by_person.len()
        );
        index
    }

    pub fn holiday_dates(&self) -> &HashSet<NaiveDate> {
        &self.holiday_dates
    }

    pub fn leave_dates_for(&self, person_id: &str) -> Option<&HashSet<NaiveDate>> {
        self.leave_dates_by_person.get(person_id)
    }

    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holiday_dates.contains(&date)
    }

    pub fn is_on_leave(&self, person_id: &str, date: NaiveDate) -> bool {
        self.leave_dates_by_person
            .get(person_id)
            .is_some_and(|dates| dates.contains(&date))
    }

    /// People whose approved leave covers `date`, sorted for stable rendering.
    pub fn people_on_leave(&self, date: NaiveDate) -> Vec<PersonId> {
        let mut people: Vec<PersonId> = self
            .leave_dates_by_person
            .iter()
            .filter(|(_, dates)| dates.contains(&date))
            .map(|(person, _)| person.clone())
            .collect();
        people.sort();
        people
    }

    /// Six weeks of seven days, starting on the Sunday on or before the 1st of the month.
    pub fn month_grid(
        &self,
        year: i32,
        month: u32,
        person_id: Option<&str>,
    ) -> WorkdayResult<MonthGrid> {
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or(WorkdayError::DateOverflow)?;
        let lead = u64::from(first.weekday().num_days_from_sunday());
        let grid_start = first
            .checked_sub_days(Days::new(lead))
            .ok_or(WorkdayError::DateOverflow)?;

        let mut weeks = Vec::with_capacity(6);
        let mut day = grid_start;
        for _ in 0..6 {
            let mut week = Vec::with_capacity(7);
            for _ in 0..7 {
                let on_leave = match person_id {
                    Some(person) if self.is_on_leave(person, day) => vec![person.to_string()],
                    Some(_) => Vec::new(),
                    None => self.people_on_leave(day),
                };
                week.push(DayCell {
                    date: day,
                    in_month: day.month() == month,
                    is_holiday: self.is_holiday(day),
                    on_leave,
                });
                day = day.succ_opt().ok_or(WorkdayError::DateOverflow)?;
            }
            weeks.push(week);
        }
        Ok(MonthGrid { year, month, weeks })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell {
    pub date: NaiveDate,
    pub in_month: bool,
    pub is_holiday: bool,
    pub on_leave: Vec<PersonId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    pub weeks: Vec<Vec<DayCell>>,
}

// --- Holiday list helpers ---

/// One holiday per Sunday in `[start, end]`, with ids stable across reseeding.
pub fn seed_sundays(start: NaiveDate, end: NaiveDate, name: Option<&str>) -> Vec<Holiday> {
    let name = name.unwrap_or(SUNDAY_HOLIDAY_NAME);
    let seeded: Vec<Holiday> = days_inclusive(start, end)
        .filter(|day| day.weekday() == Weekday::Sun)
        .map(|day| Holiday::new(&format!("holiday-sunday-{}", day.format("%Y-%m-%d")), name, day))
        .collect();
    info!("Seeded {} Sundays between {} and {}", seeded.len(), start, end);
    seeded
}

pub fn seed_sundays_for_year(year: i32, name: Option<&str>) -> WorkdayResult<Vec<Holiday>> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(WorkdayError::DateOverflow)?;
    let end = NaiveDate::from_ymd_opt(year, 12, 31).ok_or(WorkdayError::DateOverflow)?;
    Ok(seed_sundays(start, end, name))
}

/// Merges seeded holidays into an existing list; an id already present is replaced.
pub fn upsert_holidays(existing: &mut Vec<Holiday>, seeded: Vec<Holiday>) {
    for holiday in seeded {
        match existing.iter_mut().find(|h| h.id == holiday.id) {
            Some(slot) => *slot = holiday,
            None => existing.push(holiday),
        }
    }
}

/// Named holidays for display; seeded Sundays still count in the index but are not listed.
pub fn listed_holidays(holidays: &[Holiday]) -> Vec<&Holiday> {
    holidays
        .iter()
        .filter(|h| !h.name.trim().eq_ignore_ascii_case(SUNDAY_HOLIDAY_NAME))
        .collect()
}

/// Calendar days covered by a leave range, inclusive; zero for an inverted range.
pub fn leave_day_count(start: NaiveDate, end: NaiveDate) -> u32 {
    if end < start {
        return 0;
    }
    let diff = (end - start).num_days();
    u32::try_from(diff + 1).unwrap_or(u32::MAX)
}
