// src/error.rs
use chrono::NaiveDate;
use thiserror::Error;

use crate::records::{LeaveStatus, ScrumStatus};

// --- Error Types ---

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkdayError {
    #[error("Unparseable date '{raw}' in {record_kind} record {record_id}")]
    MalformedDateRecord {
        record_kind: &'static str,
        record_id: String,
        raw: String,
    },

    #[error("No working day found within {limit} days after {from}")]
    CalendarExhausted { from: NaiveDate, limit: u32 },

    #[error("Duration must be a positive number, got '{raw}'")]
    InvalidDuration { raw: String },

    #[error("End date {end} cannot be before start date {start}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("Start date {start} cannot be in the past (today is {today})")]
    StartInPast { start: NaiveDate, today: NaiveDate },

    #[error("Please select an assignee")]
    MissingAssignee,

    #[error("Please select both start and end dates")]
    MissingDates,

    #[error("Cannot {event} a scrum entry that is {from}")]
    InvalidTransition { from: ScrumStatus, event: &'static str },

    #[error("Blocker notes are required to mark an entry as blocked")]
    MissingBlockerNotes,

    #[error("A transition for scrum entry {id} is still awaiting confirmation")]
    TransitionPending { id: String },

    #[error("Store rejected transition of scrum entry {id}: {reason}")]
    TransitionRejected { id: String, reason: String },

    #[error("Unknown scrum entry {id}")]
    UnknownEntry { id: String },

    #[error("Only same-day scrums can be edited (entry created {created_on})")]
    EditWindowClosed { created_on: NaiveDate },

    #[error("Leave request {id} was already {status}")]
    LeaveAlreadyDecided { id: String, status: LeaveStatus },

    #[error("Date calculation overflow occurred")]
    DateOverflow,
}

impl WorkdayError {
    /// Transient failures can be retried by re-issuing the same action.
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkdayError::TransitionRejected { .. })
    }
}

pub type WorkdayResult<T> = Result<T, WorkdayError>;
