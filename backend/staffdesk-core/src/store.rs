// src/store.rs
//
// REST collaborator that owns holidays, leave, tasks, users and scrum entries,
// plus the board that drives scrum transitions through the optimistic overlay.

use anyhow::{Context, Result as AnyhowResult};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::calendar::CalendarIndex;
use crate::duration::DurationResolver;
use crate::error::{WorkdayError, WorkdayResult};
use crate::leave_dates::{LeaveApplication, LeaveSubmission};
use crate::overlay::ScrumOverlay;
use crate::records::{
    Holiday, LeaveDecision, LeaveRequest, LeaveStatus, PersonId, Priority, ScrumEntry, ScrumStatus,
    Task, TaskStatus, UserProfile,
};
use crate::scrum_timer::{self, Actor, ScrumEvent, TransitionRequest};
use crate::settings::Settings;

// --- Error Type ---

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP request failed")]
    Request(#[from] reqwest::Error),

    #[error("JSON processing error")]
    Json(#[from] serde_json::Error),

    #[error("URL parsing error")]
    UrlParse(#[from] url::ParseError),

    #[error("Store API error: Status={status}, Message='{message}'")]
    Api { status: StatusCode, message: String },

    #[error("Store has no {kind} with id {id}")]
    NotFound { kind: &'static str, id: String },
}

#[derive(Debug, Deserialize)]
struct StoreErrorPayload {
    message: Option<String>,
}

// --- Store Seam ---

#[async_trait]
pub trait ScrumStore: Send + Sync {
    async fn holidays(&self) -> Result<Vec<Holiday>, StoreError>;
    async fn leaves(&self) -> Result<Vec<LeaveRequest>, StoreError>;
    async fn user_leaves(&self, user_id: &str) -> Result<Vec<LeaveRequest>, StoreError>;
    async fn create_leave(&self, request: &LeaveRequest) -> Result<LeaveRequest, StoreError>;
    async fn decide_leave(&self, id: &str, status: LeaveStatus) -> Result<LeaveRequest, StoreError>;
    async fn tasks(&self) -> Result<Vec<Task>, StoreError>;
    async fn update_task_status(&self, id: &str, status: TaskStatus) -> Result<Task, StoreError>;
    async fn users(&self) -> Result<Vec<UserProfile>, StoreError>;
    async fn scrum_entries(&self) -> Result<Vec<ScrumEntry>, StoreError>;
    async fn create_scrum_entry(&self, entry: &ScrumEntry) -> Result<ScrumEntry, StoreError>;
    async fn update_scrum_entry(
        &self,
        request: &TransitionRequest,
    ) -> Result<ScrumEntry, StoreError>;
}

// --- HTTP Client ---

#[derive(Debug, Clone)]
pub struct StoreClient {
    http_client: Client,
    base_url: Url,
}

#[derive(Serialize)]
struct StatusPatch<S: Serialize> {
    status: S,
}

impl StoreClient {
    pub fn new(settings: &Settings) -> Result<Self, StoreError> {
        let base_url = Url::parse(&settings.api_base_url)?;
        let http_client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        Ok(Self { http_client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn endpoint_url(&self, endpoint: &str) -> Result<Url, StoreError> {
        let url = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        );
        Ok(Url::parse(&url)?)
    }

    pub fn build_request(
        &self,
        method: Method,
        endpoint: &str,
    ) -> Result<RequestBuilder, StoreError> {
        let url = self.endpoint_url(endpoint)?;
        Ok(self
            .http_client
            .request(method, url)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json"))
    }

    pub async fn send_and_deserialize<T: DeserializeOwned>(
        &self,
        request_builder: RequestBuilder,
        context_msg: &str,
    ) -> Result<T, StoreError> {
        let request = request_builder.build()?;
        let request_url = request.url().to_string();
        debug!("Sending request for '{}' to URL: {}", context_msg, request_url);

        let resp = self.http_client.execute(request).await.map_err(|e| {
            error!(
                "HTTP execution failed for '{}' (URL: {}): {}",
                context_msg, request_url, e
            );
            StoreError::Request(e)
        })?;

        let status = resp.status();
        info!(
            "Received response for '{}' (URL: {}): Status={}",
            context_msg, request_url, status
        );
        let bytes = resp.bytes().await?;

        if status.is_success() {
            serde_json::from_slice::<T>(&bytes).map_err(|e| {
                error!(
                    "JSON deserialization failed for '{}' (URL: {}): {}",
                    context_msg, request_url, e
                );
                StoreError::Json(e)
            })
        } else {
            let body = String::from_utf8_lossy(&bytes).to_string();
            error!(
                "API Error Response: Status={}, Body='{}' for URL: {}",
                status, body, request_url
            );
            let message = serde_json::from_str::<StoreErrorPayload>(&body)
                .ok()
                .and_then(|p| p.message)
                .unwrap_or(body);
            Err(StoreError::Api { status, message })
        }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        context_msg: &str,
    ) -> Result<T, StoreError> {
        let request = self.build_request(Method::GET, endpoint)?;
        self.send_and_deserialize(request, context_msg).await
    }

    pub async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
        context_msg: &str,
    ) -> Result<T, StoreError> {
        let request = self.build_request(method, endpoint)?.json(body);
        self.send_and_deserialize(request, context_msg).await
    }
}

#[async_trait]
impl ScrumStore for StoreClient {
    async fn holidays(&self) -> Result<Vec<Holiday>, StoreError> {
        self.get("holidays", "list holidays").await
    }

    async fn leaves(&self) -> Result<Vec<LeaveRequest>, StoreError> {
        self.get("leaves", "list leaves").await
    }

    async fn user_leaves(&self, user_id: &str) -> Result<Vec<LeaveRequest>, StoreError> {
        self.get(&format!("leaves/user/{}", user_id), "list user leaves").await
    }

    async fn create_leave(&self, request: &LeaveRequest) -> Result<LeaveRequest, StoreError> {
        self.send_json(Method::POST, "leaves", request, "create leave").await
    }

    async fn decide_leave(
        &self,
        id: &str,
        status: LeaveStatus,
    ) -> Result<LeaveRequest, StoreError> {
        let endpoint = format!("leaves/{}", id);
        self.send_json(Method::PUT, &endpoint, &StatusPatch { status }, "decide leave")
            .await
    }

    async fn tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.get("tasks", "list tasks").await
    }

    async fn update_task_status(
        &self,
        id: &str,
        status: TaskStatus,
    ) -> Result<Task, StoreError> {
        let endpoint = format!("tasks/{}", id);
        self.send_json(Method::PUT, &endpoint, &StatusPatch { status }, "update task status")
            .await
    }

    async fn users(&self) -> Result<Vec<UserProfile>, StoreError> {
        self.get("users", "list users").await
    }

    async fn scrum_entries(&self) -> Result<Vec<ScrumEntry>, StoreError> {
        self.get("scrum", "list scrum entries").await
    }

    async fn create_scrum_entry(&self, entry: &ScrumEntry) -> Result<ScrumEntry, StoreError> {
        self.send_json(Method::POST, "scrum", entry, "create scrum entry").await
    }

    async fn update_scrum_entry(
        &self,
        request: &TransitionRequest,
    ) -> Result<ScrumEntry, StoreError> {
        self.send_json(
            Method::PUT,
            &format!("scrum/{}", request.id),
            request,
            "update scrum entry",
        )
        .await
    }
}

// --- Snapshot ---

/// Read-only copy of the records scheduling works from.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub holidays: Vec<Holiday>,
    pub leaves: Vec<LeaveRequest>,
    pub tasks: Vec<Task>,
    pub users: Vec<UserProfile>,
}

impl Snapshot {
    pub fn calendar_index(&self) -> CalendarIndex {
        CalendarIndex::build(&self.holidays, &self.leaves)
    }
}

pub async fn load_snapshot<S: ScrumStore + ?Sized>(store: &S) -> AnyhowResult<Snapshot> {
    let holidays = store.holidays().await.context("Failed to fetch holidays")?;
    let leaves = store.leaves().await.context("Failed to fetch leave requests")?;
    let tasks = store.tasks().await.context("Failed to fetch tasks")?;
    let users = store.users().await.context("Failed to fetch users")?;
    info!(
        "Loaded snapshot: Holidays={}, Leaves={}, Tasks={}, Users={}",
        holidays.len(),
        leaves.len(),
        tasks.len(),
        users.len()
    );
    Ok(Snapshot {
        holidays,
        leaves,
        tasks,
        users,
    })
}

// --- Leave Workflow ---

/// Validates an application and posts the resulting pending request.
pub async fn submit_leave_application<S: ScrumStore + ?Sized>(
    store: &S,
    resolver: &DurationResolver<'_>,
    application: LeaveApplication,
    id: &str,
    created_at: &str,
    today: NaiveDate,
) -> AnyhowResult<LeaveSubmission> {
    let mut submission = application.submit(resolver, id, created_at, today)?;
    submission.request = store
        .create_leave(&submission.request)
        .await
        .with_context(|| format!("Failed to create leave request {}", id))?;
    Ok(submission)
}

/// Applies an approver's decision and persists the new status.
pub async fn record_leave_decision<S: ScrumStore + ?Sized>(
    store: &S,
    request: LeaveRequest,
    decision: LeaveDecision,
) -> AnyhowResult<LeaveRequest> {
    let decided = request.decide(decision)?;
    info!("Leave {} for {} marked {}", decided.id, decided.user_id, decided.status);
    store
        .decide_leave(&decided.id, decided.status)
        .await
        .with_context(|| format!("Failed to record decision for leave {}", decided.id))
}

// --- Scrum Board ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrumDisplay {
    pub id: String,
    pub user_id: PersonId,
    pub status: ScrumStatus,
    pub elapsed: String,
    pub pending: bool,
}

struct PendingGuard<'o> {
    overlay: &'o mut ScrumOverlay,
    id: &'o str,
    armed: bool,
}

impl PendingGuard<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!("Scrum transition for {} cancelled before the store answered", self.id);
            self.overlay.rollback(self.id);
        }
    }
}

/// One UI session's view of the scrum entries, with its own overlay.
pub struct ScrumBoard<S: ScrumStore> {
    store: S,
    actor: Actor,
    entries: Vec<ScrumEntry>,
    tasks: Vec<Task>,
    overlay: ScrumOverlay,
}

impl<S: ScrumStore> ScrumBoard<S> {
    pub fn new(store: S, actor: Actor) -> Self {
        Self {
            store,
            actor,
            entries: Vec::new(),
            tasks: Vec::new(),
            overlay: ScrumOverlay::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn overlay(&self) -> &ScrumOverlay {
        &self.overlay
    }

    /// Replaces the server copies; overlays on entries that changed underneath are dropped.
    pub async fn refresh(&mut self) -> Result<(), StoreError> {
        let entries = self.store.scrum_entries().await?;
        for entry in &entries {
            self.overlay.observe_server(entry);
        }
        self.entries = entries;
        self.tasks = self.store.tasks().await?;
        debug!(
            "Scrum board refreshed: Entries={}, Pending={}",
            self.entries.len(),
            self.overlay.len()
        );
        Ok(())
    }

    pub async fn start(
        &mut self,
        id: &str,
        task_details: &str,
        priority: Priority,
        now: DateTime<Utc>,
    ) -> Result<ScrumEntry, StoreError> {
        let owner = self.actor.person_id.clone();
        let entry = scrum_timer::start_entry(id, owner, task_details, priority, now);
        let created = self.store.create_scrum_entry(&entry).await?;
        self.sync_linked_task(&created, scrum_timer::linked_task_status(created.status))
            .await;
        self.entries.insert(0, created.clone());
        Ok(created)
    }

    /// Applies the transition locally and returns the request to persist.
    pub fn begin(
        &mut self,
        id: &str,
        event: ScrumEvent,
        now: DateTime<Utc>,
    ) -> WorkdayResult<TransitionRequest> {
        if self.overlay.is_pending(id) {
            return Err(WorkdayError::TransitionPending { id: id.to_string() });
        }
        let base = self
            .entries
            .iter()
            .find(|e| e.id == id)
            .ok_or_else(|| WorkdayError::UnknownEntry { id: id.to_string() })?;
        let transition = scrum_timer::transition(base, event, &self.actor, now)?;
        self.overlay.apply(base, transition)
    }

    /// Clears or rolls back the overlay for `id` depending on the store's answer.
    pub fn settle(
        &mut self,
        id: &str,
        outcome: Result<ScrumEntry, StoreError>,
    ) -> WorkdayResult<ScrumEntry> {
        match outcome {
            Ok(saved) => {
                self.overlay.confirm(id);
                match self.entries.iter_mut().find(|e| e.id == saved.id) {
                    Some(slot) => *slot = saved.clone(),
                    None => self.entries.insert(0, saved.clone()),
                }
                Ok(saved)
            }
            Err(e) => {
                warn!("Store refused scrum transition for {}: {}", id, e);
                Err(self.overlay.reject(id, e.to_string()))
            }
        }
    }

    /// Drops a transition that will never be settled, restoring the server view.
    pub fn abandon(&mut self, id: &str) -> bool {
        self.overlay.rollback(id)
    }

    pub async fn dispatch(
        &mut self,
        id: &str,
        event: ScrumEvent,
        now: DateTime<Utc>,
    ) -> WorkdayResult<ScrumEntry> {
        let request = self.begin(id, event, now)?;
        // Rolls the overlay back if this future is dropped while the store call is in flight.
        let guard = PendingGuard {
            overlay: &mut self.overlay,
            id,
            armed: true,
        };
        let outcome = self.store.update_scrum_entry(&request).await;
        guard.disarm();
        let saved = self.settle(id, outcome)?;
        self.sync_linked_task(&saved, scrum_timer::linked_task_status(request.new_status))
            .await;
        Ok(saved)
    }

    async fn sync_linked_task(&mut self, entry: &ScrumEntry, status: Option<TaskStatus>) {
        let Some(status) = status else {
            return;
        };
        let Some(task) = scrum_timer::find_linked_task(&self.tasks, entry) else {
            debug!("No linked task for scrum entry {}", entry.id);
            return;
        };
        if task.status == status {
            return;
        }
        let task_id = task.id.clone();
        match self.store.update_task_status(&task_id, status).await {
            Ok(updated) => {
                if let Some(slot) = self.tasks.iter_mut().find(|t| t.id == task_id) {
                    *slot = updated;
                }
            }
            // The scrum transition already succeeded; the task catches up on next refresh.
            Err(e) => warn!("Failed to sync task {} to {:?}: {}", task_id, status, e),
        }
    }

    /// Entries as the UI should render them, overlays applied.
    pub fn visible(&self) -> Vec<&ScrumEntry> {
        self.overlay.view_all(&self.entries)
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn display(&self, now: DateTime<Utc>) -> Vec<ScrumDisplay> {
        self.visible()
            .into_iter()
            .map(|entry| ScrumDisplay {
                id: entry.id.clone(),
                user_id: entry.user_id.clone(),
                status: entry.status,
                elapsed: scrum_timer::elapsed_display(entry, now),
                pending: self.overlay.is_pending(&entry.id),
            })
            .collect()
    }
}
