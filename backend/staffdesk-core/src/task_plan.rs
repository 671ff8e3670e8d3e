// src/task_plan.rs
//
// Task form scheduling: keeps start and end dates consistent with the
// assignee's calendar every time one of the inputs changes.

use chrono::NaiveDate;
use tracing::info;

use crate::duration::{DurationResolver, TaskDuration};
use crate::error::{WorkdayError, WorkdayResult};
use crate::records::{parse_calendar_date, Assignable, DurationUnit, PersonId, Task};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDraft {
    pub assignee: Option<PersonId>,
    pub start_date: Option<NaiveDate>,
    pub duration: Option<TaskDuration>,
}

impl TaskDraft {
    /// Reads the scheduling inputs of a stored task. A missing or non-positive
    /// duration leaves the draft without one.
    pub fn from_task(task: &Task) -> WorkdayResult<Self> {
        let start_date = match task.start_date.as_deref().filter(|s| !s.trim().is_empty()) {
            Some(raw) => Some(parse_calendar_date(raw).ok_or_else(|| {
                WorkdayError::MalformedDateRecord {
                    record_kind: "task",
                    record_id: task.id.clone(),
                    raw: raw.to_string(),
                }
            })?),
            None => None,
        };
        let duration = task.duration_value.and_then(|value| {
            TaskDuration::new(value, task.duration_unit.unwrap_or(DurationUnit::Days)).ok()
        });
        Ok(Self {
            assignee: task.assignee.clone().filter(|a| !a.is_empty()),
            start_date,
            duration,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskPlan {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    pub start_adjusted: bool,
    /// User-facing messages describing automatic corrections.
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct TaskPlanner<'a> {
    resolver: DurationResolver<'a>,
}

impl<'a> TaskPlanner<'a> {
    pub fn new(resolver: DurationResolver<'a>) -> Self {
        Self { resolver }
    }

    /// Corrected dates for a draft, or `None` while no start date is chosen.
    pub fn plan(&self, draft: &TaskDraft, today: NaiveDate) -> WorkdayResult<Option<TaskPlan>> {
        let Some(requested) = draft.start_date else {
            return Ok(None);
        };
        let assignee = draft.assignee.as_deref();
        let mut notes = Vec::new();

        let not_past = requested.max(today);
        let start = self.resolver.advance_to_working_day(not_past, assignee)?;
        let start_adjusted = start != requested;
        if start_adjusted {
            info!(
                "Task start moved from {} to {} (assignee={:?})",
                requested, start, assignee
            );
            notes.push(format!(
                "Start date adjusted to next available working day: {}",
                start.format("%Y-%m-%d")
            ));
        }

        let end = match &draft.duration {
            Some(duration) => self.resolver.compute_end_date(start, duration, assignee)?,
            None => None,
        };

        Ok(Some(TaskPlan {
            start,
            end,
            start_adjusted,
            notes,
        }))
    }

    /// Assignable people with no approved leave between `start` and `end`.
    pub fn available_assignees<'c, C: Assignable>(
        &self,
        candidates: &'c [C],
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Vec<&'c C> {
        let pool: Vec<&'c C> = candidates
            .iter()
            .filter(|c| c.role().map_or(true, |role| role.is_assignable()))
            .collect();
        let available = self.resolver.filter_available(&pool, start, end);
        available.into_iter().copied().collect()
    }

    /// Returns `task` with its dates replaced by the planned ones; a task without a
    /// duration keeps the end date it already had.
    pub fn apply(&self, task: &Task, today: NaiveDate) -> WorkdayResult<Task> {
        let draft = TaskDraft::from_task(task)?;
        let mut planned = task.clone();
        if let Some(plan) = self.plan(&draft, today)? {
            planned.start_date = Some(plan.start.format("%Y-%m-%d").to_string());
            if let Some(end) = plan.end {
                planned.end_date = Some(end.format("%Y-%m-%d").to_string());
            }
        }
        Ok(planned)
    }
}

/// Hard checks run when the task form is submitted.
pub fn validate_task_submission(
    assignee: Option<&str>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> WorkdayResult<()> {
    if assignee.map_or(true, |a| a.trim().is_empty()) {
        return Err(WorkdayError::MissingAssignee);
    }
    let (Some(start), Some(end)) = (start, end) else {
        return Err(WorkdayError::MissingDates);
    };
    if start < today {
        return Err(WorkdayError::StartInPast { start, today });
    }
    if end < start {
        return Err(WorkdayError::InvalidRange { start, end });
    }
    Ok(())
}

#[cfg(test)]
mod task_plan_tests {
    use super::*;
    use crate::calendar::CalendarIndex;
    use crate::records::{
        Holiday, LeaveRequest, LeaveStatus, LeaveType, Priority, Role, TaskStatus, UserProfile,
    };
    use rust_decimal::Decimal;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap()
    }

    fn index() -> CalendarIndex {
        let holidays = vec![
            Holiday::new("h1", "New Year", d("2026-01-01")),
            Holiday::new("h2", "Republic Day", d("2026-01-26")),
        ];
        let leaves = vec![LeaveRequest {
            id: "lv-1".to_string(),
            user_id: "meera".to_string(),
            display_id: None,
            leave_type: LeaveType::Casual,
            start_date: "2026-01-02".to_string(),
            end_date: "2026-01-03".to_string(),
            reason: None,
            status: LeaveStatus::Approved,
            created_at: "2025-12-15".to_string(),
        }];
        CalendarIndex::build(&holidays, &leaves)
    }

    fn user(id: &str, role: Role) -> UserProfile {
        UserProfile {
            user_id: id.to_string(),
            username: id.to_string(),
            name: None,
            role,
        }
    }

    #[test]
    fn start_skips_holiday_and_assignee_leave() {
        let index = index();
        let planner = TaskPlanner::new(DurationResolver::new(&index));
        let draft = TaskDraft {
            assignee: Some("meera".to_string()),
            start_date: Some(d("2026-01-01")),
            duration: Some(TaskDuration::parse("2", DurationUnit::Days).unwrap()),
        };

        let plan = planner.plan(&draft, d("2025-12-30")).unwrap().unwrap();
        assert_eq!(plan.start, d("2026-01-04"));
        assert_eq!(plan.end, Some(d("2026-01-05")));
        assert!(plan.start_adjusted);
        assert_eq!(
            plan.notes,
            vec!["Start date adjusted to next available working day: 2026-01-04".to_string()]
        );
    }

    #[test]
    fn past_start_is_clamped_to_today() {
        let index = index();
        let planner = TaskPlanner::new(DurationResolver::new(&index));
        let draft = TaskDraft {
            assignee: Some("ravi".to_string()),
            start_date: Some(d("2026-01-10")),
            duration: None,
        };
        let plan = planner.plan(&draft, d("2026-01-20")).unwrap().unwrap();
        assert_eq!(plan.start, d("2026-01-20"));
        assert_eq!(plan.end, None);
    }

    #[test]
    fn no_start_means_no_plan() {
        let index = index();
        let planner = TaskPlanner::new(DurationResolver::new(&index));
        let draft = TaskDraft {
            assignee: None,
            start_date: None,
            duration: Some(TaskDuration::parse("3", DurationUnit::Days).unwrap()),
        };
        assert_eq!(planner.plan(&draft, d("2026-01-01")).unwrap(), None);
    }

    #[test]
    fn apply_overwrites_end_date_from_stored_task() {
        let index = index();
        let planner = TaskPlanner::new(DurationResolver::new(&index));
        let task = Task {
            id: "t-9".to_string(),
            title: "Onboarding pack".to_string(),
            description: None,
            assignee: Some("ravi".to_string()),
            assignor_name: Some("Admin".to_string()),
            priority: Priority::High,
            duration_value: Some(Decimal::from(20)),
            duration_unit: Some(DurationUnit::Hours),
            start_date: Some("2026-01-24".to_string()),
            end_date: Some("2026-01-24".to_string()),
            status: TaskStatus::Todo,
        };
        let planned = planner.apply(&task, d("2026-01-20")).unwrap();
        assert_eq!(planned.start_date.as_deref(), Some("2026-01-24"));
        // 20h -> 3 working days: 24, 25, (26 holiday), 27.
        assert_eq!(planned.end_date.as_deref(), Some("2026-01-27"));
    }

    #[test]
    fn assignee_pool_excludes_admins_and_people_on_leave() {
        let index = index();
        let planner = TaskPlanner::new(DurationResolver::new(&index));
        let users = vec![
            user("meera", Role::Staff),
            user("ravi", Role::Intern),
            user("boss", Role::Admin),
            user("kim", Role::Freelancer),
        ];
        let available =
            planner.available_assignees(&users, Some(d("2026-01-02")), Some(d("2026-01-05")));
        let ids: Vec<&str> = available.iter().map(|u| u.user_id.as_str()).collect();
        assert_eq!(ids, vec!["ravi", "kim"]);
    }

    #[test]
    fn submission_checks_run_in_order() {
        let today = d("2026-02-01");
        assert_eq!(
            validate_task_submission(None, Some(today), Some(today), today),
            Err(WorkdayError::MissingAssignee)
        );
        assert_eq!(
            validate_task_submission(Some("ravi"), Some(today), None, today),
            Err(WorkdayError::MissingDates)
        );
        assert_eq!(
            validate_task_submission(Some("ravi"), Some(d("2026-01-31")), Some(today), today),
            Err(WorkdayError::StartInPast {
                start: d("2026-01-31"),
                today
            })
        );
        assert_eq!(
            validate_task_submission(
                Some("ravi"),
                Some(d("2026-02-03")),
                Some(d("2026-02-02")),
                today,
            ),
            Err(WorkdayError::InvalidRange {
                start: d("2026-02-03"),
                end: d("2026-02-02")
            })
        );
        assert!(validate_task_submission(Some("ravi"), Some(today), Some(today), today).is_ok());
    }
}
