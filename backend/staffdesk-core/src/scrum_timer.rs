// src/scrum_timer.rs
//
// Scrum entry lifecycle. The accumulated `timer` only covers finished runs;
// while an entry is in progress its `updated_at` marks when the current run began.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{WorkdayError, WorkdayResult};
use crate::records::{PersonId, Priority, ScrumEntry, ScrumStatus, Task, TaskStatus, UserProfile};

// --- Events & Actors ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScrumEvent {
    Pause,
    Resume,
    Block { notes: String },
    Complete,
}

impl ScrumEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ScrumEvent::Pause => "pause",
            ScrumEvent::Resume => "resume",
            ScrumEvent::Block { .. } => "block",
            ScrumEvent::Complete => "complete",
        }
    }
}

/// Whoever triggers a transition. Authorization is enforced by the store;
/// the state machine applies the same rules to every actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub person_id: PersonId,
    pub privileged: bool,
}

impl Actor {
    pub fn new(person_id: impl Into<PersonId>, privileged: bool) -> Self {
        Self {
            person_id: person_id.into(),
            privileged,
        }
    }
}

impl From<&UserProfile> for Actor {
    fn from(profile: &UserProfile) -> Self {
        Self::new(profile.user_id.clone(), profile.role.is_privileged())
    }
}

// --- Transition Output ---

/// Patch sent to the scrum update endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub id: String,
    #[serde(rename = "status")]
    pub new_status: ScrumStatus,
    pub timer_delta: u64,
    pub timer: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocker_notes: Option<String>,
    #[serde(rename = "updatedAt")]
    pub at: DateTime<Utc>,
    pub actor_privileged: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// The entry as it looks once the store accepts the request.
    pub entry: ScrumEntry,
    pub request: TransitionRequest,
    /// Status the linked task should move to, if any.
    pub linked_task_status: Option<TaskStatus>,
}

pub fn start_entry(
    id: impl Into<String>,
    user_id: impl Into<PersonId>,
    task_details: impl Into<String>,
    priority: Priority,
    now: DateTime<Utc>,
) -> ScrumEntry {
    let entry = ScrumEntry {
        id: id.into(),
        user_id: user_id.into(),
        task_details: task_details.into(),
        status: ScrumStatus::InProgress,
        priority,
        blocker_notes: None,
        timer: 0,
        created_at: now,
        updated_at: now,
        paused_at: None,
    };
    info!("Scrum entry {} started for {}", entry.id, entry.user_id);
    entry
}

/// Seconds of the current run, zero unless the entry is in progress.
pub fn running_seconds(entry: &ScrumEntry, now: DateTime<Utc>) -> u64 {
    if entry.status.is_running() {
        clamp_seconds(now - entry.updated_at)
    } else {
        0
    }
}

fn clamp_seconds(delta: chrono::Duration) -> u64 {
    u64::try_from(delta.num_seconds()).unwrap_or(0)
}

pub fn transition(
    entry: &ScrumEntry,
    event: ScrumEvent,
    actor: &Actor,
    now: DateTime<Utc>,
) -> WorkdayResult<Transition> {
    let from = entry.status;
    let invalid = || WorkdayError::InvalidTransition {
        from,
        event: event.name(),
    };

    let (new_status, blocker_notes) = match (&event, from) {
        (ScrumEvent::Pause, ScrumStatus::InProgress) => (ScrumStatus::Paused, None),
        (ScrumEvent::Resume, ScrumStatus::Paused) => (ScrumStatus::InProgress, None),
        (ScrumEvent::Block { notes }, ScrumStatus::InProgress) => {
            let notes = notes.trim();
            if notes.is_empty() {
                return Err(WorkdayError::MissingBlockerNotes);
            }
            (ScrumStatus::Blocked, Some(notes.to_string()))
        }
        (ScrumEvent::Complete, s) if !s.is_terminal() => (ScrumStatus::Completed, None),
        _ => {
            warn!(
                "Rejected scrum transition: Entry={}, From={}, Event={}",
                entry.id,
                from,
                event.name()
            );
            return Err(invalid());
        }
    };

    let timer_delta = running_seconds(entry, now);
    let mut next = entry.clone();
    next.status = new_status;
    next.timer = entry.timer.saturating_add(timer_delta);
    next.updated_at = now;
    next.paused_at = match new_status {
        ScrumStatus::Paused => Some(now),
        _ => None,
    };
    if blocker_notes.is_some() {
        next.blocker_notes = blocker_notes.clone();
    }

    info!(
        "Scrum entry {} {} -> {} by {} (privileged={}), timer {} -> {}",
        entry.id, from, new_status, actor.person_id, actor.privileged, entry.timer, next.timer
    );

    let request = TransitionRequest {
        id: entry.id.clone(),
        new_status,
        timer_delta,
        timer: next.timer,
        blocker_notes,
        at: now,
        actor_privileged: actor.privileged,
    };
    Ok(Transition {
        entry: next,
        request,
        linked_task_status: linked_task_status(new_status),
    })
}

/// Task status mirrored from a scrum status; pausing leaves the task alone.
pub fn linked_task_status(status: ScrumStatus) -> Option<TaskStatus> {
    match status {
        ScrumStatus::InProgress => Some(TaskStatus::InProgress),
        ScrumStatus::Blocked => Some(TaskStatus::Blocked),
        ScrumStatus::Completed => Some(TaskStatus::Completed),
        ScrumStatus::Paused => None,
    }
}

/// The task a scrum entry reports on: same assignee, title equal to the entry's details.
pub fn find_linked_task<'t>(tasks: &'t [Task], entry: &ScrumEntry) -> Option<&'t Task> {
    tasks.iter().find(|task| {
        task.assignee.as_deref() == Some(entry.user_id.as_str()) && task.title == entry.task_details
    })
}

// --- Display ---

pub fn elapsed_seconds(entry: &ScrumEntry, now: DateTime<Utc>) -> u64 {
    match entry.status {
        ScrumStatus::InProgress => entry.timer.saturating_add(running_seconds(entry, now)),
        ScrumStatus::Paused | ScrumStatus::Blocked => entry.timer,
        // Wall-clock span of the session, pauses included.
        ScrumStatus::Completed => clamp_seconds(entry.updated_at - entry.created_at),
    }
}

pub fn format_hms(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

pub fn elapsed_display(entry: &ScrumEntry, now: DateTime<Utc>) -> String {
    format_hms(elapsed_seconds(entry, now))
}

// --- Editing & History ---

/// Non-privileged actors may only edit entries created on `today` (UTC).
pub fn can_edit(entry: &ScrumEntry, actor: &Actor, today: NaiveDate) -> WorkdayResult<()> {
    if actor.privileged {
        return Ok(());
    }
    let created_on = entry.created_at.date_naive();
    if created_on == today {
        Ok(())
    } else {
        debug!(
            "Edit refused: Entry={}, Actor={}, CreatedOn={}, Today={}",
            entry.id, actor.person_id, created_on, today
        );
        Err(WorkdayError::EditWindowClosed { created_on })
    }
}

/// Entries matching the optional day and staff filters, newest first.
pub fn filter_history<'e>(
    entries: &'e [ScrumEntry],
    day: Option<NaiveDate>,
    staff: Option<&str>,
) -> Vec<&'e ScrumEntry> {
    let mut matching: Vec<&ScrumEntry> = entries
        .iter()
        .filter(|e| day.map_or(true, |d| e.created_at.date_naive() == d))
        .filter(|e| staff.map_or(true, |s| e.user_id == s))
        .collect();
    matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    matching
}
