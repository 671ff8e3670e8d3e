// src/working_day.rs
use chrono::NaiveDate;

use crate::calendar::CalendarIndex;

/// Answers "is this a working day" for one person, or company-wide when no person is given.
#[derive(Debug, Clone, Copy)]
pub struct WorkingDays<'a> {
    index: &'a CalendarIndex,
    person_id: Option<&'a str>,
}

impl<'a> WorkingDays<'a> {
    pub fn for_person(index: &'a CalendarIndex, person_id: &'a str) -> Self {
        Self {
            index,
            person_id: Some(person_id),
        }
    }

    pub fn company_wide(index: &'a CalendarIndex) -> Self {
        Self {
            index,
            person_id: None,
        }
    }

    pub fn new(index: &'a CalendarIndex, person_id: Option<&'a str>) -> Self {
        Self { index, person_id }
    }

    pub fn person_id(&self) -> Option<&'a str> {
        self.person_id
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        is_working_day(self.index, date, self.person_id)
    }
}

/// A date is not a working day when it is a holiday, or when the given person is on approved leave.
pub fn is_working_day(index: &CalendarIndex, date: NaiveDate, person_id: Option<&str>) -> bool {
    if index.is_holiday(date) {
        return false;
    }
    match person_id {
        Some(person) => !index.is_on_leave(person, date),
        None => true,
    }
}
