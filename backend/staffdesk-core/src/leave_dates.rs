// src/leave_dates.rs
use chrono::NaiveDate;
use tracing::{info, warn};

use crate::calendar::{days_inclusive, leave_day_count, CalendarIndex};
use crate::duration::DurationResolver;
use crate::error::{WorkdayError, WorkdayResult};
use crate::records::{LeaveRequest, LeaveStatus, LeaveType, PersonId};
use crate::working_day::WorkingDays;

/// Outcome of pushing a proposed leave range past unavailable days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub start_changed: bool,
    pub end_changed: bool,
}

impl NormalizedRange {
    pub fn changed(&self) -> bool {
        self.start_changed || self.end_changed
    }

    /// Feedback for the leave form, one line per moved date.
    pub fn note(&self) -> Option<String> {
        let mut lines = Vec::new();
        if self.start_changed {
            lines.push(format!(
                "Start date adjusted to {} (skipped holidays/approved leaves)",
                self.start.format("%Y-%m-%d")
            ));
        }
        if self.end_changed {
            lines.push(format!(
                "End date adjusted to {} (skipped holidays/approved leaves)",
                self.end.format("%Y-%m-%d")
            ));
        }
        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

/// Moves `proposed_start` and `proposed_end` forward, independently, to the
/// person's next working day. Ordering between the two is not enforced here.
pub fn normalize_range(
    resolver: &DurationResolver<'_>,
    person_id: &str,
    proposed_start: NaiveDate,
    proposed_end: NaiveDate,
) -> WorkdayResult<NormalizedRange> {
    let start = resolver.advance_to_working_day(proposed_start, Some(person_id))?;
    let end = resolver.advance_to_working_day(proposed_end, Some(person_id))?;
    let range = NormalizedRange {
        start,
        end,
        start_changed: start != proposed_start,
        end_changed: end != proposed_end,
    };
    if range.changed() {
        info!(
            "Leave range for {} normalized: {}..{} -> {}..{}",
            person_id, proposed_start, proposed_end, start, end
        );
    }
    Ok(range)
}

/// Hard checks run when the leave form is submitted.
pub fn validate_leave_submission(
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> WorkdayResult<()> {
    if start < today {
        return Err(WorkdayError::StartInPast { start, today });
    }
    if end < start {
        return Err(WorkdayError::InvalidRange { start, end });
    }
    Ok(())
}

/// Holidays and already-approved leave days of `person_id` inside `[start, end]`, ascending.
pub fn unavailable_dates_in_range(
    index: &CalendarIndex,
    person_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<NaiveDate> {
    let working = WorkingDays::for_person(index, person_id);
    days_inclusive(start, end)
        .filter(|day| !working.contains(*day))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveApplication {
    pub user_id: PersonId,
    pub leave_type: LeaveType,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveSubmission {
    pub request: LeaveRequest,
    pub day_count: u32,
    /// Non-blocking warning listing holidays or approved leave inside the range.
    pub warning: Option<String>,
}

impl LeaveApplication {
    /// The pending request as it is posted to the store.
    pub fn into_request(self, id: &str, created_at: &str) -> LeaveRequest {
        LeaveRequest {
            id: id.to_string(),
            display_id: Some(self.user_id.clone()),
            user_id: self.user_id,
            leave_type: self.leave_type,
            start_date: self.start.format("%Y-%m-%d").to_string(),
            end_date: self.end.format("%Y-%m-%d").to_string(),
            reason: self.reason.filter(|r| !r.trim().is_empty()),
            status: LeaveStatus::Pending,
            created_at: created_at.to_string(),
        }
    }

    /// Validates the range and builds the pending request sent to the store.
    pub fn submit(
        self,
        resolver: &DurationResolver<'_>,
        id: &str,
        created_at: &str,
        today: NaiveDate,
    ) -> WorkdayResult<LeaveSubmission> {
        validate_leave_submission(self.start, self.end, today)?;

        let clashes =
            unavailable_dates_in_range(resolver.index(), &self.user_id, self.start, self.end);
        let warning = if clashes.is_empty() {
            None
        } else {
            let listed: Vec<String> = clashes
                .iter()
                .map(|d| d.format("%Y-%m-%d").to_string())
                .collect();
            warn!(
                "Leave request {} for {} overlaps unavailable dates: {:?}",
                id, self.user_id, listed
            );
            Some(format!(
                "Note: Your leave request includes holidays or already approved leave dates: {}",
                listed.join(", ")
            ))
        };

        let day_count = leave_day_count(self.start, self.end);
        Ok(LeaveSubmission {
            request: self.into_request(id, created_at),
            day_count,
            warning,
        })
    }
}
