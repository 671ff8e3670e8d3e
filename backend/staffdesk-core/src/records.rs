// src/records.rs
//
// Read shapes handed over by the REST store. Dates stay as the raw strings the
// store returns; they are parsed (and bad ones skipped) when the calendar is built.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{WorkdayError, WorkdayResult};

pub type PersonId = String;

/// Parses a store date (`YYYY-MM-DD`, optionally followed by a `T...` time part).
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let day_part = match trimmed.split_once('T') {
        Some((day, _)) => day,
        None => trimmed,
    };
    NaiveDate::parse_from_str(day_part, "%Y-%m-%d").ok()
}

fn parse_record_date(
    record_kind: &'static str,
    record_id: &str,
    raw: &str,
) -> WorkdayResult<NaiveDate> {
    parse_calendar_date(raw).ok_or_else(|| WorkdayError::MalformedDateRecord {
        record_kind,
        record_id: record_id.to_string(),
        raw: raw.to_string(),
    })
}

// --- Holidays ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holiday {
    pub id: String,
    pub name: String,
    pub date: String,
}

impl Holiday {
    pub fn new(id: &str, name: &str, date: NaiveDate) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            date: date.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn calendar_date(&self) -> WorkdayResult<NaiveDate> {
        parse_record_date("holiday", &self.id, &self.date)
    }
}

// --- Leave ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LeaveType {
    #[default]
    Casual,
    Sick,
    Earned,
    Unpaid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LeaveStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LeaveStatus::Pending => "pending",
            LeaveStatus::Approved => "approved",
            LeaveStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveDecision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRequest {
    pub id: String,
    pub user_id: PersonId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_id: Option<String>,
    #[serde(rename = "type", default)]
    pub leave_type: LeaveType,
    pub start_date: String,
    pub end_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub status: LeaveStatus,
    pub created_at: String,
}

impl LeaveRequest {
    pub fn is_approved(&self) -> bool {
        self.status == LeaveStatus::Approved
    }

    pub fn start(&self) -> WorkdayResult<NaiveDate> {
        parse_record_date("leave", &self.id, &self.start_date)
    }

    pub fn end(&self) -> WorkdayResult<NaiveDate> {
        parse_record_date("leave", &self.id, &self.end_date)
    }

    /// Approvers decide a pending request exactly once.
    pub fn decide(mut self, decision: LeaveDecision) -> WorkdayResult<Self> {
        if self.status != LeaveStatus::Pending {
            return Err(WorkdayError::LeaveAlreadyDecided {
                id: self.id,
                status: self.status,
            });
        }
        self.status = match decision {
            LeaveDecision::Approve => LeaveStatus::Approved,
            LeaveDecision::Reject => LeaveStatus::Rejected,
        };
        Ok(self)
    }
}

// --- Tasks ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Hours,
    #[default]
    Days,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    #[serde(alias = "inProgress")]
    InProgress,
    Review,
    Blocked,
    #[serde(alias = "done")]
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, alias = "assignedTo")]
    pub assignee: Option<PersonId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignor_name: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub duration_value: Option<Decimal>,
    #[serde(default)]
    pub duration_unit: Option<DurationUnit>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
}

// --- Scrum ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScrumStatus {
    #[default]
    InProgress,
    Paused,
    Blocked,
    Completed,
}

impl ScrumStatus {
    pub fn is_running(self) -> bool {
        self == ScrumStatus::InProgress
    }

    pub fn is_terminal(self) -> bool {
        self == ScrumStatus::Completed
    }
}

impl fmt::Display for ScrumStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScrumStatus::InProgress => "in_progress",
            ScrumStatus::Paused => "paused",
            ScrumStatus::Blocked => "blocked",
            ScrumStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrumEntry {
    pub id: String,
    pub user_id: PersonId,
    pub task_details: String,
    #[serde(default)]
    pub status: ScrumStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocker_notes: Option<String>,
    /// Seconds accumulated while not running.
    #[serde(default)]
    pub timer: u64,
    pub created_at: DateTime<Utc>,
    /// While `in_progress` this is the instant the current run started.
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<DateTime<Utc>>,
}

// --- People ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Owner,
    Param,
    Staff,
    Intern,
    Freelancer,
}

impl Role {
    /// Administrator-equivalent roles may act on other people's records.
    pub fn is_privileged(self) -> bool {
        matches!(self, Role::Admin | Role::Owner | Role::Param)
    }

    pub fn is_assignable(self) -> bool {
        matches!(self, Role::Staff | Role::Intern | Role::Freelancer)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(alias = "id")]
    pub user_id: PersonId,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: Role,
}

/// Anything that can be offered in an assignee picker.
pub trait Assignable {
    fn person_id(&self) -> &str;

    fn role(&self) -> Option<Role> {
        None
    }
}

impl Assignable for UserProfile {
    fn person_id(&self) -> &str {
        &self.user_id
    }

    fn role(&self) -> Option<Role> {
        Some(self.role)
    }
}

impl Assignable for String {
    fn person_id(&self) -> &str {
        self
    }
}

impl<T: Assignable> Assignable for &T {
    fn person_id(&self) -> &str {
        (*self).person_id()
    }

    fn role(&self) -> Option<Role> {
        (*self).role()
    }
}

#[cfg(test)]
mod record_tests {
    use super::*;

    #[test]
    fn parses_plain_and_timestamped_dates() {
        let expected = NaiveDate::from_ymd_opt(2026, 1, 26).unwrap();
        assert_eq!(parse_calendar_date("2026-01-26"), Some(expected));
        assert_eq!(parse_calendar_date(" 2026-01-26T00:00:00.000Z"), Some(expected));
        assert_eq!(parse_calendar_date("26/01/2026"), None);
        assert_eq!(parse_calendar_date(""), None);
    }

    #[test]
    fn leave_request_reads_store_json() {
        let json = r#"{
            "id": "lv-1",
            "userId": "u-7",
            "type": "sick",
            "startDate": "2026-02-02",
            "endDate": "2026-02-03",
            "status": "approved",
            "createdAt": "2026-01-30T09:00:00Z"
        }"#;
        let leave: LeaveRequest = serde_json::from_str(json).unwrap();
        assert_eq!(leave.leave_type, LeaveType::Sick);
        assert!(leave.is_approved());
        assert_eq!(leave.end().unwrap(), NaiveDate::from_ymd_opt(2026, 2, 3).unwrap());
    }

    #[test]
    fn task_status_accepts_legacy_spellings() {
        let done: TaskStatus = serde_json::from_str("\"done\"").unwrap();
        let in_progress: TaskStatus = serde_json::from_str("\"inProgress\"").unwrap();
        assert_eq!(done, TaskStatus::Completed);
        assert_eq!(in_progress, TaskStatus::InProgress);
    }

    #[test]
    fn task_reads_assigned_to_alias_and_decimal_duration() {
        let json = r#"{
            "id": "t-1",
            "title": "Payroll export",
            "assignedTo": "u-3",
            "durationValue": 12.5,
            "durationUnit": "hours"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.assignee.as_deref(), Some("u-3"));
        assert_eq!(task.duration_value, Some(Decimal::new(125, 1)));
        assert_eq!(task.duration_unit, Some(DurationUnit::Hours));
        assert_eq!(task.status, TaskStatus::Todo);
    }

    #[test]
    fn leave_decided_only_once() {
        let leave = LeaveRequest {
            id: "lv-2".to_string(),
            user_id: "u-1".to_string(),
            display_id: None,
            leave_type: LeaveType::Casual,
            start_date: "2026-03-02".to_string(),
            end_date: "2026-03-02".to_string(),
            reason: None,
            status: LeaveStatus::Pending,
            created_at: "2026-02-20".to_string(),
        };
        let approved = leave.decide(LeaveDecision::Approve).unwrap();
        assert_eq!(approved.status, LeaveStatus::Approved);

        let err = approved.decide(LeaveDecision::Reject).unwrap_err();
        assert_eq!(
            err,
            WorkdayError::LeaveAlreadyDecided {
                id: "lv-2".to_string(),
                status: LeaveStatus::Approved
            }
        );
    }

    #[test]
    fn roles_split_into_privileged_and_assignable() {
        assert!(Role::Param.is_privileged());
        assert!(!Role::Param.is_assignable());
        assert!(Role::Freelancer.is_assignable());
        assert!(!Role::Staff.is_privileged());
    }
}
