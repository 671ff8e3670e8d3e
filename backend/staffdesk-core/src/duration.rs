// src/duration.rs
use chrono::NaiveDate;
use rust_decimal::prelude::*;
use rust_decimal_macros::dec;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::calendar::CalendarIndex;
use crate::error::{WorkdayError, WorkdayResult};
use crate::records::{Assignable, DurationUnit};
use crate::working_day::WorkingDays;

// --- Constants ---

pub const HOURS_PER_WORKING_DAY: Decimal = dec!(8);
pub const WORKING_DAY_SEARCH_LIMIT: u32 = 365;
/// Longest task the resolver will walk, in working days (ten years).
pub const MAX_TASK_WORKING_DAYS: u32 = 3650;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulingPolicy {
    pub hours_per_working_day: Decimal,
    /// Maximum consecutive days inspected while looking for the next working day.
    pub search_limit_days: u32,
}

impl Default for SchedulingPolicy {
    fn default() -> Self {
        Self {
            hours_per_working_day: HOURS_PER_WORKING_DAY,
            search_limit_days: WORKING_DAY_SEARCH_LIMIT,
        }
    }
}

// --- Durations ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskDuration {
    value: Decimal,
    unit: DurationUnit,
}

impl TaskDuration {
    pub fn new(value: Decimal, unit: DurationUnit) -> WorkdayResult<Self> {
        let ceiling = match unit {
            DurationUnit::Days => Decimal::from(MAX_TASK_WORKING_DAYS),
            DurationUnit::Hours => Decimal::from(MAX_TASK_WORKING_DAYS) * dec!(24),
        };
        if value <= Decimal::ZERO || value > ceiling {
            return Err(WorkdayError::InvalidDuration {
                raw: value.to_string(),
            });
        }
        Ok(Self { value, unit })
    }

    /// Parses the free-text duration field of a task form.
    pub fn parse(raw: &str, unit: DurationUnit) -> WorkdayResult<Self> {
        let value = Decimal::from_str(raw.trim()).map_err(|_| WorkdayError::InvalidDuration {
            raw: raw.to_string(),
        })?;
        Self::new(value, unit)
    }

    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn unit(&self) -> DurationUnit {
        self.unit
    }

    /// Hours round up to whole working days; day counts round down.
    pub fn working_days(&self, hours_per_working_day: Decimal) -> u32 {
        let days = match self.unit {
            DurationUnit::Hours => (self.value / hours_per_working_day).ceil(),
            DurationUnit::Days => self.value.floor(),
        };
        days.to_u32().unwrap_or(u32::MAX)
    }
}

// --- Resolver ---

#[derive(Debug, Clone, Copy)]
pub struct DurationResolver<'a> {
    index: &'a CalendarIndex,
    policy: SchedulingPolicy,
}

impl<'a> DurationResolver<'a> {
    pub fn new(index: &'a CalendarIndex) -> Self {
        Self::with_policy(index, SchedulingPolicy::default())
    }

    pub fn with_policy(index: &'a CalendarIndex, policy: SchedulingPolicy) -> Self {
        Self { index, policy }
    }

    pub fn index(&self) -> &'a CalendarIndex {
        self.index
    }

    pub fn policy(&self) -> SchedulingPolicy {
        self.policy
    }

    /// First working day on or after `date`. Never returns a date earlier than `date`.
    pub fn advance_to_working_day(
        &self,
        date: NaiveDate,
        person_id: Option<&str>,
    ) -> WorkdayResult<NaiveDate> {
        let working = WorkingDays::new(self.index, person_id);
        let mut current = date;
        for _ in 0..self.policy.search_limit_days {
            if working.contains(current) {
                if current != date {
                    debug!(
                        "Advanced {} to working day {} (person={:?})",
                        date, current, person_id
                    );
                }
                return Ok(current);
            }
            current = current.succ_opt().ok_or(WorkdayError::DateOverflow)?;
        }
        warn!(
            "No working day within {} days after {} (person={:?}); calendar data looks wrong",
            self.policy.search_limit_days, date, person_id
        );
        Err(WorkdayError::CalendarExhausted {
            from: date,
            limit: self.policy.search_limit_days,
        })
    }

    /// End date of a task that starts at `start_date` and needs `duration` of work.
    ///
    /// Returns `Ok(None)` when the duration rounds down to zero working days; callers
    /// must then leave the end date unset. The start day counts when it is a working day.
    pub fn compute_end_date(
        &self,
        start_date: NaiveDate,
        duration: &TaskDuration,
        person_id: Option<&str>,
    ) -> WorkdayResult<Option<NaiveDate>> {
        let days = duration.working_days(self.policy.hours_per_working_day);
        if days == 0 {
            debug!(
                "Duration {} {:?} is less than one working day, no end date",
                duration.value(),
                duration.unit()
            );
            return Ok(None);
        }
        if days > MAX_TASK_WORKING_DAYS {
            warn!(
                "Duration {} {:?} spans {} working days, above the {} day maximum",
                duration.value(),
                duration.unit(),
                days,
                MAX_TASK_WORKING_DAYS
            );
            return Err(WorkdayError::InvalidDuration {
                raw: duration.value().to_string(),
            });
        }

        let mut current = self.advance_to_working_day(start_date, person_id)?;
        let mut counted = 1;
        while counted < days {
            let next = current.succ_opt().ok_or(WorkdayError::DateOverflow)?;
            current = self.advance_to_working_day(next, person_id)?;
            counted += 1;
        }
        debug!(
            "Resolved end date: start={}, working_days={}, person={:?}, end={}",
            start_date, days, person_id, current
        );
        Ok(Some(current))
    }

    /// Working days for `person_id` in `[start, end]`.
    pub fn working_days_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        person_id: Option<&str>,
    ) -> u32 {
        let working = WorkingDays::new(self.index, person_id);
        let count = crate::calendar::days_inclusive(start, end)
            .filter(|day| working.contains(*day))
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Candidates with no approved leave anywhere in `[start, end]`.
    ///
    /// Holidays are not considered; they apply to everyone equally. Without both
    /// bounds the list is returned unfiltered.
    pub fn filter_available<'c, C: Assignable>(
        &self,
        candidates: &'c [C],
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Vec<&'c C> {
        let (start, end) = match (start, end) {
            (Some(start), Some(end)) => (start, end),
            _ => return candidates.iter().collect(),
        };
        candidates
            .iter()
            .filter(|candidate| {
                let id = candidate.person_id();
                let free = self
                    .index
                    .leave_dates_for(id)
                    .map_or(true, |dates| !dates.iter().any(|day| *day >= start && *day <= end));
                if !free {
                    debug!("{} is on leave between {} and {}", id, start, end);
                }
                free
            })
            .collect()
    }
}
