use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{StoreState, SupportStore};
use shared_models::{local_day, Consultant, ConsultantStatus, SessionStatus, SupportSession};
use video_room_cell::RoomInfo;

use crate::error::SupportError;
use crate::models::SupportTopic;
use crate::services::queue::QueueManager;
use crate::services::websocket::SupportNotifier;

/// Owner of every mutation that flips a session out of `pending` or moves a
/// consultant between busy and available.
///
/// Each operation checks its predicates and applies its writes under one store
/// write guard, and publishes its events before releasing it, so two
/// operations on the same session or consultant are totally ordered and their
/// events leave in that order.
#[derive(Debug, Clone)]
pub struct ClaimController {
    store: SupportStore,
    queue: QueueManager,
    notifier: SupportNotifier,
    utc_offset_minutes: i32,
}

impl ClaimController {
    pub fn new(
        store: SupportStore,
        queue: QueueManager,
        notifier: SupportNotifier,
        config: &AppConfig,
    ) -> Self {
        Self {
            store,
            queue,
            notifier,
            utc_offset_minutes: config.local_utc_offset_minutes,
        }
    }

    /// Binds a pending session to an available consultant. Exactly one
    /// concurrent caller per session can succeed; the rest get `ClaimConflict`.
    pub async fn try_claim(
        &self,
        session_id: Uuid,
        consultant_id: Uuid,
        room: &RoomInfo,
        match_reasons: Vec<String>,
        now: DateTime<Utc>,
    ) -> Result<SupportSession, SupportError> {
        let mut state = self.store.write().await;

        let session = state
            .sessions
            .get(&session_id)
            .ok_or(SupportError::SessionNotFound(session_id))?;
        let consultant = state
            .consultants
            .get(&consultant_id)
            .ok_or(SupportError::ConsultantNotFound(consultant_id))?;

        if session.status != SessionStatus::Pending
            || consultant.status != ConsultantStatus::Available
            || state.binding_session(consultant_id).is_some()
        {
            warn!(
                "Claim of session {} by consultant {} lost (session {}, consultant {})",
                session_id, consultant_id, session.status, consultant.status
            );
            return Err(SupportError::ClaimConflict { session_id, consultant_id });
        }

        self.queue.remove(&mut state, session_id);

        let today = local_day(now, self.utc_offset_minutes);
        if let Some(consultant) = state.consultants.get_mut(&consultant_id) {
            consultant.status = ConsultantStatus::Busy;
            consultant.last_seen_at = Some(now);
            consultant.record_acceptance(today);
        }

        let session = match state.sessions.get_mut(&session_id) {
            Some(session) => session,
            None => return Err(SupportError::SessionNotFound(session_id)),
        };
        session.status = SessionStatus::Connecting;
        session.consultant_id = Some(consultant_id);
        session.accepted_at = Some(now);
        session.wait_seconds = Some(session.seconds_waiting(now));
        session.room_url = Some(room.room_url.clone());
        session.room_name = Some(room.room_name.clone());
        session.match_reasons = match_reasons;
        let claimed = session.clone();
        state.record_wait(claimed.urgency, claimed.wait_seconds.unwrap_or_default());

        info!(
            "Session {} claimed by consultant {} after {}s",
            session_id,
            consultant_id,
            claimed.wait_seconds.unwrap_or_default()
        );

        self.notifier.publish(
            SupportTopic::SessionAccepted,
            Some(session_id),
            json!({
                "requesterId": claimed.requester_id,
                "consultantId": consultant_id,
                "roomUrl": room.room_url,
                "roomName": room.room_name,
                "waitSeconds": claimed.wait_seconds,
                "matchReasons": claimed.match_reasons,
            }),
        );
        self.publish_consultant_status(consultant_id, ConsultantStatus::Busy);
        self.publish_queue_changed(&state, "claimed", session_id);

        Ok(claimed)
    }

    /// Ends a connecting or active session and frees its consultant.
    pub async fn release(
        &self,
        session_id: Uuid,
        ended_by: Uuid,
        resolution_notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<SupportSession, SupportError> {
        let mut state = self.store.write().await;

        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or(SupportError::SessionNotFound(session_id))?;

        if !session.is_participant(ended_by) {
            return Err(SupportError::Forbidden(
                "Only a participant can end this session".to_string(),
            ));
        }
        if !session.status.can_transition_to(&SessionStatus::Completed) {
            return Err(SupportError::InvalidTransition {
                from: session.status,
                to: SessionStatus::Completed,
            });
        }

        session.status = SessionStatus::Completed;
        session.ended_at = Some(now);
        session.ended_by = Some(ended_by);
        session.duration_seconds = Some(
            session
                .started_at
                .map(|started| (now - started).num_seconds().max(0))
                .unwrap_or(0),
        );
        session.resolution_notes = resolution_notes;
        let ended = session.clone();
        state.close_session(session_id);

        info!(
            "Session {} completed by {} after {}s",
            session_id,
            ended_by,
            ended.duration_seconds.unwrap_or_default()
        );

        self.notifier.publish(
            SupportTopic::SessionEnded,
            Some(session_id),
            json!({
                "status": ended.status,
                "endedBy": ended_by,
                "durationSeconds": ended.duration_seconds,
            }),
        );
        if let Some(consultant_id) = ended.consultant_id {
            // First completed session is what makes the pair a prior relationship.
            state.preference_entry(ended.requester_id, consultant_id).last_session_at = Some(now);
            self.free_consultant(&mut state, consultant_id, now);
        }

        Ok(ended)
    }

    /// Cancels a pending request on behalf of its requester.
    pub async fn withdraw(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<SupportSession, SupportError> {
        let mut state = self.store.write().await;

        let session = state
            .sessions
            .get(&session_id)
            .ok_or(SupportError::SessionNotFound(session_id))?;

        if !session.is_requester(user_id) {
            return Err(SupportError::Forbidden(
                "Only the requester can cancel this request".to_string(),
            ));
        }
        if session.status != SessionStatus::Pending {
            return Err(SupportError::InvalidTransition {
                from: session.status,
                to: SessionStatus::Cancelled,
            });
        }

        self.queue.remove(&mut state, session_id);

        let session = match state.sessions.get_mut(&session_id) {
            Some(session) => session,
            None => return Err(SupportError::SessionNotFound(session_id)),
        };
        session.status = SessionStatus::Cancelled;
        session.ended_at = Some(now);
        session.ended_by = Some(user_id);
        let cancelled = session.clone();
        state.close_session(session_id);

        info!("Session {} cancelled by requester", session_id);

        self.notifier.publish(
            SupportTopic::SessionEnded,
            Some(session_id),
            json!({ "status": cancelled.status, "endedBy": user_id }),
        );
        self.publish_queue_changed(&state, "cancelled", session_id);

        Ok(cancelled)
    }

    /// Manual presence change. `busy` is reserved for the claim path and a
    /// consultant bound to a session cannot change status at all.
    pub async fn set_consultant_status(
        &self,
        consultant_id: Uuid,
        status: ConsultantStatus,
        now: DateTime<Utc>,
    ) -> Result<Consultant, SupportError> {
        if status == ConsultantStatus::Busy {
            return Err(SupportError::ValidationError(
                "Status 'busy' is set automatically when a session is accepted".to_string(),
            ));
        }

        let mut state = self.store.write().await;

        if !state.consultants.contains_key(&consultant_id) {
            return Err(SupportError::ConsultantNotFound(consultant_id));
        }
        if state.binding_session(consultant_id).is_some() {
            warn!("Consultant {} tried to change status while bound", consultant_id);
            return Err(SupportError::ConsultantBound(consultant_id));
        }

        let consultant = match state.consultants.get_mut(&consultant_id) {
            Some(consultant) => consultant,
            None => return Err(SupportError::ConsultantNotFound(consultant_id)),
        };
        let previous = consultant.status;
        consultant.status = status;
        consultant.last_seen_at = Some(now);
        let updated = consultant.clone();

        info!("Consultant {} status {} -> {}", consultant_id, previous, status);
        self.publish_consultant_status(consultant_id, status);

        Ok(updated)
    }

    /// Cancels connecting sessions accepted at or before `cutoff`, freeing
    /// their consultants. Returns the sessions that were cancelled.
    pub async fn force_cancel_stale(
        &self,
        cutoff: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Vec<SupportSession> {
        let mut state = self.store.write().await;

        let stale: Vec<Uuid> = state
            .open_sessions()
            .filter(|s| s.status == SessionStatus::Connecting)
            .filter(|s| s.accepted_at.is_some_and(|accepted| accepted <= cutoff))
            .map(|s| s.id)
            .collect();

        let mut cancelled = Vec::with_capacity(stale.len());
        for session_id in stale {
            let Some(session) = state.sessions.get_mut(&session_id) else {
                continue;
            };
            session.status = SessionStatus::Cancelled;
            session.ended_at = Some(now);
            let expired = session.clone();
            state.close_session(session_id);

            warn!("Session {} never became active, cancelling", session_id);
            self.notifier.publish(
                SupportTopic::SessionEnded,
                Some(session_id),
                json!({ "status": expired.status, "reason": "connecting-timeout" }),
            );
            if let Some(consultant_id) = expired.consultant_id {
                self.free_consultant(&mut state, consultant_id, now);
            }
            cancelled.push(expired);
        }

        cancelled
    }

    fn free_consultant(&self, state: &mut StoreState, consultant_id: Uuid, now: DateTime<Utc>) {
        if let Some(consultant) = state.consultants.get_mut(&consultant_id) {
            consultant.status = ConsultantStatus::Available;
            consultant.last_seen_at = Some(now);
            self.publish_consultant_status(consultant_id, ConsultantStatus::Available);
        }
    }

    fn publish_consultant_status(&self, consultant_id: Uuid, status: ConsultantStatus) {
        self.notifier.publish(
            SupportTopic::ConsultantStatusChanged,
            None,
            json!({ "consultantId": consultant_id, "status": status }),
        );
    }

    fn publish_queue_changed(&self, state: &StoreState, reason: &str, session_id: Uuid) {
        self.notifier.publish(
            SupportTopic::QueueChanged,
            Some(session_id),
            json!({ "reason": reason, "totalInQueue": self.queue.depth(state) }),
        );
    }
}
