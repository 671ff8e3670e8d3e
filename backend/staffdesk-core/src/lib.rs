// src/lib.rs
//
// Scheduling core of the staffdesk HR app: working-day calendar, task and
// leave date correction, and the scrum timer with its optimistic overlay.

pub mod calendar;
pub mod duration;
pub mod error;
pub mod leave_dates;
pub mod overlay;
pub mod records;
pub mod scrum_timer;
pub mod settings;
pub mod store;
pub mod task_plan;
pub mod telemetry;
pub mod working_day;


pub use calendar::{CalendarIndex, DayCell, MonthGrid};
pub use duration::{DurationResolver, SchedulingPolicy, TaskDuration};
pub use error::{WorkdayError, WorkdayResult};
pub use leave_dates::{normalize_range, LeaveApplication, NormalizedRange};
pub use overlay::ScrumOverlay;
pub use records::{
    Assignable, DurationUnit, Holiday, LeaveDecision, LeaveRequest, LeaveStatus, LeaveType,
    PersonId, Priority, Role, ScrumEntry, ScrumStatus, Task, TaskStatus, UserProfile,
};
pub use scrum_timer::{Actor, ScrumEvent, Transition, TransitionRequest};
pub use settings::{Settings, SettingsError};
pub use store::{load_snapshot, ScrumBoard, ScrumStore, Snapshot, StoreClient, StoreError};
pub use task_plan::{TaskDraft, TaskPlan, TaskPlanner};
pub use working_day::{is_working_day, WorkingDays};
