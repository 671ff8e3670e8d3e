// src/overlay.rs
use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::error::{WorkdayError, WorkdayResult};
use crate::records::ScrumEntry;
use crate::scrum_timer::{Transition, TransitionRequest};

#[derive(Debug, Clone)]
struct PendingTransition {
    /// Server copy the transition was computed from.
    base: ScrumEntry,
    projected: ScrumEntry,
    request: TransitionRequest,
}

/// Locally applied scrum transitions awaiting the store, keyed by entry id.
///
/// Owned by a single UI session. At most one transition per entry is in flight.
#[derive(Debug, Default)]
pub struct ScrumOverlay {
    pending: HashMap<String, PendingTransition>,
}

impl ScrumOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `transition` on top of `base` and returns the request to send.
    pub fn apply(
        &mut self,
        base: &ScrumEntry,
        transition: Transition,
    ) -> WorkdayResult<TransitionRequest> {
        if self.pending.contains_key(&base.id) {
            warn!("Overlay already pending for scrum entry {}", base.id);
            return Err(WorkdayError::TransitionPending { id: base.id.clone() });
        }
        let request = transition.request.clone();
        debug!(
            "Overlay applied: Entry={}, Status={} -> {}",
            base.id, base.status, transition.entry.status
        );
        self.pending.insert(
            base.id.clone(),
            PendingTransition {
                base: base.clone(),
                projected: transition.entry,
                request: transition.request,
            },
        );
        Ok(request)
    }

    /// The store accepted the transition; the server copy is authoritative again.
    pub fn confirm(&mut self, id: &str) -> bool {
        let cleared = self.pending.remove(id).is_some();
        if cleared {
            debug!("Overlay confirmed and cleared for scrum entry {}", id);
        }
        cleared
    }

    /// Drops the overlay for `id` without an answer from the store, e.g. when
    /// the request was abandoned. Returns true if one was pending.
    pub fn rollback(&mut self, id: &str) -> bool {
        let dropped = self.pending.remove(id);
        if let Some(p) = &dropped {
            info!(
                "Overlay abandoned for scrum entry {} (restored status {})",
                id, p.base.status
            );
        }
        dropped.is_some()
    }

    /// The store refused the transition. Drops the overlay and returns the
    /// error to surface, with the entry's displayed state back to its base.
    pub fn reject(&mut self, id: &str, reason: impl Into<String>) -> WorkdayError {
        let reason = reason.into();
        match self.pending.remove(id) {
            Some(p) => info!(
                "Overlay rolled back for scrum entry {} (restored status {}): {}",
                id, p.base.status, reason
            ),
            None => warn!("Rejection for scrum entry {} without a pending overlay", id),
        }
        WorkdayError::TransitionRejected {
            id: id.to_string(),
            reason,
        }
    }

    /// Discards the overlay when the server reports a version of the entry
    /// different from the one the transition was based on. Returns true if one was dropped.
    pub fn observe_server(&mut self, entry: &ScrumEntry) -> bool {
        let conflicting = self
            .pending
            .get(&entry.id)
            .map_or(false, |p| p.base != *entry);
        if conflicting {
            self.pending.remove(&entry.id);
            info!("Overlay for scrum entry {} discarded after server update", entry.id);
        }
        conflicting
    }

    /// What the UI should show for `server`.
    pub fn view<'s>(&'s self, server: &'s ScrumEntry) -> &'s ScrumEntry {
        self.pending
            .get(&server.id)
            .map_or(server, |p| &p.projected)
    }

    pub fn view_all<'s>(&'s self, server: &'s [ScrumEntry]) -> Vec<&'s ScrumEntry> {
        server.iter().map(|entry| self.view(entry)).collect()
    }

    pub fn pending_request(&self, id: &str) -> Option<&TransitionRequest> {
        self.pending.get(id).map(|p| &p.request)
    }

    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod overlay_tests {
    use super::*;
    use crate::records::{Priority, ScrumStatus};
    use crate::scrum_timer::{start_entry, transition, Actor, ScrumEvent};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()
    }

    fn server_entry() -> ScrumEntry {
        start_entry("s-1", "u1", "Fix login", Priority::High, t0())
    }

    fn pause(entry: &ScrumEntry, secs: i64) -> Transition {
        let at = t0() + Duration::seconds(secs);
        transition(entry, ScrumEvent::Pause, &Actor::new("u1", false), at).unwrap()
    }

    #[test]
    fn view_prefers_overlay_until_confirmed() {
        let server = server_entry();
        let mut overlay = ScrumOverlay::new();
        let request = overlay.apply(&server, pause(&server, 40)).unwrap();
        assert_eq!(request.timer, 40);
        assert_eq!(overlay.view(&server).status, ScrumStatus::Paused);

        assert!(overlay.confirm("s-1"));
        assert!(overlay.is_empty());
        assert_eq!(overlay.view(&server), &server);
    }

    #[test]
    fn reject_restores_previous_state() {
        let server = server_entry();
        let mut overlay = ScrumOverlay::new();
        overlay.apply(&server, pause(&server, 40)).unwrap();

        let err = overlay.reject("s-1", "stale version");
        assert!(err.is_retryable());
        assert_eq!(
            err,
            WorkdayError::TransitionRejected {
                id: "s-1".to_string(),
                reason: "stale version".to_string()
            }
        );
        assert_eq!(overlay.view(&server).status, ScrumStatus::InProgress);
        assert!(!overlay.is_pending("s-1"));
    }

    #[test]
    fn second_transition_waits_for_the_first() {
        let server = server_entry();
        let mut overlay = ScrumOverlay::new();
        let first = pause(&server, 10);
        let projected = first.entry.clone();
        overlay.apply(&server, first).unwrap();

        let resume = transition(
            &projected,
            ScrumEvent::Resume,
            &Actor::new("u1", false),
            t0() + Duration::seconds(20),
        )
        .unwrap();
        assert_eq!(
            overlay.apply(&server, resume),
            Err(WorkdayError::TransitionPending { id: "s-1".to_string() })
        );
        assert_eq!(overlay.pending_request("s-1").map(|r| r.timer), Some(10));
    }

    #[test]
    fn conflicting_server_update_discards_overlay() {
        let server = server_entry();
        let mut overlay = ScrumOverlay::new();
        overlay.apply(&server, pause(&server, 40)).unwrap();

        // Unchanged server copy keeps the overlay.
        assert!(!overlay.observe_server(&server));
        assert!(overlay.is_pending("s-1"));

        let mut changed = server.clone();
        changed.status = ScrumStatus::Completed;
        changed.updated_at = t0() + Duration::seconds(35);
        assert!(overlay.observe_server(&changed));
        assert_eq!(overlay.view(&changed), &changed);
    }

    #[test]
    fn rollback_restores_server_view_and_allows_retry() {
        let server = server_entry();
        let mut overlay = ScrumOverlay::new();
        overlay.apply(&server, pause(&server, 40)).unwrap();

        assert!(overlay.rollback("s-1"));
        assert!(!overlay.rollback("s-1"));
        assert_eq!(overlay.view(&server), &server);
        assert!(overlay.apply(&server, pause(&server, 50)).is_ok());
    }

    #[test]
    fn overlays_are_independent_per_entry() {
        let a = server_entry();
        let mut b = server_entry();
        b.id = "s-2".to_string();
        let mut overlay = ScrumOverlay::new();
        overlay.apply(&a, pause(&a, 5)).unwrap();

        let shown = overlay
            .view_all(&[a.clone(), b.clone()])
            .into_iter()
            .map(|e| e.status)
            .collect::<Vec<_>>();
        assert_eq!(shown, vec![ScrumStatus::Paused, ScrumStatus::InProgress]);
        assert_eq!(overlay.len(), 1);
    }
}
