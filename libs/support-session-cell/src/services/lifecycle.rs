use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use consultant_cell::{ConsultantDirectory, MatchingEngine};
use shared_config::AppConfig;
use shared_database::SupportStore;
use shared_models::{Consultant, ConsultantStatus, SessionStatus, SupportSession};
use video_room_cell::{retry_once, room_name_for, RoomError, RoomProvider};

use crate::error::SupportError;
use crate::models::{
    AcceptOutcome, CreateSupportResponse, JoinTicket, MatchedConsultant, NewSupportRequest,
    QueueEntryView, QueuePosition, SupportTopic,
};
use crate::services::claim::ClaimController;
use crate::services::queue::QueueManager;
use crate::services::websocket::SupportNotifier;

/// Match/claim rounds attempted for a new request before it is left queued.
pub const MAX_MATCH_ATTEMPTS: usize = 3;

/// Session lifecycle: create, accept, start, end, cancel, rate and join,
/// plus the re-dispatch of queued work when consultants free up.
pub struct SupportSessionService {
    store: SupportStore,
    directory: ConsultantDirectory,
    matcher: MatchingEngine,
    queue: QueueManager,
    controller: ClaimController,
    rooms: Arc<dyn RoomProvider>,
    notifier: SupportNotifier,
    connecting_timeout: Duration,
}

impl SupportSessionService {
    pub fn new(
        store: SupportStore,
        rooms: Arc<dyn RoomProvider>,
        notifier: SupportNotifier,
        config: &AppConfig,
    ) -> Self {
        let queue = QueueManager::from_config(config);
        Self {
            directory: ConsultantDirectory::new(store.clone(), config),
            matcher: MatchingEngine::from_config(config),
            controller: ClaimController::new(store.clone(), queue.clone(), notifier.clone(), config),
            connecting_timeout: Duration::seconds(config.connecting_timeout_seconds),
            store,
            queue,
            rooms,
            notifier,
        }
    }

    pub fn notifier(&self) -> &SupportNotifier {
        &self.notifier
    }

    pub fn directory(&self) -> &ConsultantDirectory {
        &self.directory
    }

    pub fn room_provider_kind(&self) -> &'static str {
        self.rooms.kind()
    }

    /// Provider reachability as reported by the provider itself.
    pub async fn room_provider_healthy(&self) -> bool {
        match self.rooms.health_check().await {
            Ok(healthy) => healthy,
            Err(e) => {
                warn!("Room provider health check failed: {}", e);
                false
            }
        }
    }

    pub async fn queue_depth(&self) -> usize {
        let state = self.store.read().await;
        self.queue.depth(&state)
    }

    // ==========================================================================
    // CREATE / ACCEPT
    // ==========================================================================

    pub async fn create_request(
        &self,
        request: NewSupportRequest,
    ) -> Result<CreateSupportResponse, SupportError> {
        let session_id = {
            let mut state = self.store.write().await;

            if let Some(existing) = state.open_request_for(request.requester_id) {
                warn!(
                    "Requester {} already has open session {}",
                    request.requester_id, existing.id
                );
                return Err(SupportError::ActiveSessionExists(existing.id));
            }

            let session = SupportSession::new(
                request.requester_id,
                request.hospital_id,
                request.department,
                request.urgency,
                request.issue_summary,
                Utc::now(),
            );
            let session_id = session.id;
            info!(
                "New {} support request {} for {} from {}",
                session.urgency, session_id, session.department, session.requester_id
            );

            self.queue.enqueue(&mut state, session);
            self.notifier.publish(
                SupportTopic::QueueChanged,
                Some(session_id),
                json!({ "reason": "enqueued", "totalInQueue": self.queue.depth(&state) }),
            );
            session_id
        };

        let matched = match self.auto_match(session_id).await {
            Err(SupportError::UpstreamUnavailable(source)) => {
                error!("Room provisioning failed for new session {}: {}", session_id, source);
                return Err(SupportError::RoomProvisioningFailed { session_id, source });
            }
            other => other?,
        };

        match matched {
            Some(outcome) => {
                let consultant = match outcome.session.consultant_id {
                    Some(id) => self.store.consultant(id).await,
                    None => None,
                };
                Ok(CreateSupportResponse {
                    session_id,
                    status: outcome.session.status,
                    queue_position: None,
                    consultant: consultant.as_ref().map(MatchedConsultant::from),
                    room_url: Some(outcome.room.room_url),
                    match_reasons: Some(outcome.session.match_reasons),
                })
            }
            None => {
                let state = self.store.read().await;
                let status = state
                    .sessions
                    .get(&session_id)
                    .map(|s| s.status)
                    .unwrap_or(SessionStatus::Pending);
                let queue_position = self
                    .queue
                    .position(&state, session_id, Utc::now())
                    .and_then(|p| p.position);
                Ok(CreateSupportResponse {
                    session_id,
                    status,
                    queue_position,
                    consultant: None,
                    room_url: None,
                    match_reasons: None,
                })
            }
        }
    }

    /// Manual accept by a consultant picking a request from the queue.
    pub async fn accept(
        &self,
        session_id: Uuid,
        consultant_id: Uuid,
    ) -> Result<AcceptOutcome, SupportError> {
        self.claim_with_room(session_id, consultant_id, Vec::new()).await
    }

    /// Runs up to `MAX_MATCH_ATTEMPTS` match/claim rounds for a pending
    /// session. `Ok(None)` leaves the session queued because nobody was
    /// available or every candidate was taken first. A room provisioning
    /// failure comes back as `UpstreamUnavailable` with the session still
    /// pending.
    async fn auto_match(&self, session_id: Uuid) -> Result<Option<AcceptOutcome>, SupportError> {
        for attempt in 1..=MAX_MATCH_ATTEMPTS {
            let now = Utc::now();
            let candidate = {
                let state = self.store.read().await;
                let session = state
                    .sessions
                    .get(&session_id)
                    .ok_or(SupportError::SessionNotFound(session_id))?;
                if session.status != SessionStatus::Pending {
                    return Ok(None);
                }
                let snapshot = ConsultantDirectory::snapshot_from(&state, session.requester_id);
                self.matcher.find_match(session, &snapshot, self.directory.today(now))
            };

            let Some(candidate) = candidate else {
                debug!("No consultant available for session {}, leaving it queued", session_id);
                return Ok(None);
            };

            match self
                .claim_with_room(session_id, candidate.consultant.id, candidate.reasons)
                .await
            {
                Ok(outcome) => return Ok(Some(outcome)),
                Err(SupportError::ClaimConflict { consultant_id, .. }) => {
                    warn!(
                        "Auto-match attempt {} for session {} lost consultant {}",
                        attempt, session_id, consultant_id
                    );
                }
                Err(e) => return Err(e),
            }
        }

        warn!(
            "Session {} still unmatched after {} attempts",
            session_id, MAX_MATCH_ATTEMPTS
        );
        Ok(None)
    }

    /// Provision the room first, then claim. The room name is derived from the
    /// session, so a losing racer's room may be the room a concurrent winner is
    /// about to bind. A loser only tears it down once the session is terminal
    /// and not bound to it; rooms of still-pending sessions are reused by the
    /// next claim or destroyed on cancel.
    async fn claim_with_room(
        &self,
        session_id: Uuid,
        consultant_id: Uuid,
        match_reasons: Vec<String>,
    ) -> Result<AcceptOutcome, SupportError> {
        {
            let state = self.store.read().await;
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
            {
                return Err(SupportError::ClaimConflict { session_id, consultant_id });
            }
        }

        let room = retry_once("create_room", || self.rooms.create_room(session_id)).await?;

        match self
            .controller
            .try_claim(session_id, consultant_id, &room, match_reasons, Utc::now())
            .await
        {
            Ok(session) => Ok(AcceptOutcome { session, room }),
            Err(e) => {
                let orphaned = self.store.session(session_id).await.map_or(true, |s| {
                    s.status.is_terminal() && s.room_name.as_deref() != Some(room.room_name.as_str())
                });
                if orphaned {
                    self.release_room(&room.room_name).await;
                } else {
                    debug!("Keeping room {} for session {}", room.room_name, session_id);
                }
                Err(e)
            }
        }
    }

    // ==========================================================================
    // TRANSITIONS
    // ==========================================================================

    pub async fn start(&self, session_id: Uuid) -> Result<SupportSession, SupportError> {
        let mut state = self.store.write().await;
        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or(SupportError::SessionNotFound(session_id))?;

        if session.status != SessionStatus::Connecting {
            return Err(SupportError::InvalidTransition {
                from: session.status,
                to: SessionStatus::Active,
            });
        }

        let now = Utc::now();
        session.status = SessionStatus::Active;
        session.started_at = Some(now);
        let started = session.clone();

        info!("Session {} is active", session_id);
        self.notifier.publish(
            SupportTopic::SessionStarted,
            Some(session_id),
            json!({ "startedAt": now, "consultantId": started.consultant_id }),
        );

        Ok(started)
    }

    pub async fn end(
        &self,
        session_id: Uuid,
        ended_by: Uuid,
        resolution_notes: Option<String>,
    ) -> Result<SupportSession, SupportError> {
        let ended = self
            .controller
            .release(session_id, ended_by, resolution_notes, Utc::now())
            .await?;

        if let Some(room_name) = ended.room_name.as_deref() {
            self.release_room(room_name).await;
        }
        self.dispatch_waiting().await;

        Ok(ended)
    }

    /// Withdraws a pending request. A claim that lost a consultant-side race
    /// may have left the session's room behind, so it is released here.
    pub async fn cancel(&self, session_id: Uuid, user_id: Uuid) -> Result<SupportSession, SupportError> {
        let cancelled = self.controller.withdraw(session_id, user_id, Utc::now()).await?;
        self.release_room(&room_name_for(session_id)).await;
        Ok(cancelled)
    }

    pub async fn rate(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        rating: i64,
        feedback: Option<String>,
    ) -> Result<SupportSession, SupportError> {
        let rating = u8::try_from(rating)
            .ok()
            .filter(|r| (1..=5).contains(r))
            .ok_or_else(|| SupportError::ValidationError("Rating must be between 1 and 5".to_string()))?;

        let mut state = self.store.write().await;
        let session = state
            .sessions
            .get_mut(&session_id)
            .ok_or(SupportError::SessionNotFound(session_id))?;

        if !session.is_requester(user_id) {
            return Err(SupportError::Forbidden(
                "Only the requester can rate this session".to_string(),
            ));
        }
        if session.status != SessionStatus::Completed {
            return Err(SupportError::ValidationError(format!(
                "Only completed sessions can be rated (session is {})",
                session.status
            )));
        }
        if session.rating.is_some() {
            return Err(SupportError::AlreadyRated(session_id));
        }

        let now = Utc::now();
        session.rating = Some(rating);
        session.feedback = feedback;
        let rated = session.clone();

        if let Some(consultant_id) = rated.consultant_id {
            state
                .preference_entry(rated.requester_id, consultant_id)
                .record_rated_session(rating, now);
        }

        info!("Session {} rated {} by requester", session_id, rating);
        Ok(rated)
    }

    /// Issue a room token for a participant of a connecting or active session.
    pub async fn join(
        &self,
        session_id: Uuid,
        user_id: Uuid,
        user_name: &str,
        is_consultant: Option<bool>,
    ) -> Result<JoinTicket, SupportError> {
        let session = self
            .store
            .session(session_id)
            .await
            .ok_or(SupportError::SessionNotFound(session_id))?;

        if !session.is_participant(user_id) {
            return Err(SupportError::Forbidden(
                "Only session participants can join".to_string(),
            ));
        }
        let is_owner = session.is_consultant(user_id);
        if is_consultant.is_some_and(|claimed| claimed != is_owner) {
            return Err(SupportError::Forbidden(format!(
                "User {} is not the {} of this session",
                user_id,
                if is_owner { "requester" } else { "consultant" }
            )));
        }
        if !session.status.binds_consultant() {
            return Err(SupportError::NotJoinable {
                session_id,
                status: session.status,
            });
        }

        let (Some(room_url), Some(room_name)) = (session.room_url, session.room_name) else {
            return Err(SupportError::UpstreamUnavailable(RoomError::RoomNotFound {
                room_name: room_name_for(session_id),
            }));
        };

        let token = retry_once("issue_token", || {
            self.rooms.issue_token(session_id, user_id, user_name, is_owner)
        })
        .await?;

        debug!("Issued room token for {} in session {}", user_id, session_id);
        Ok(JoinTicket {
            token,
            room_url,
            room_name,
            is_owner,
        })
    }

    // ==========================================================================
    // CONSULTANT PRESENCE & DISPATCH
    // ==========================================================================

    pub async fn set_consultant_status(
        &self,
        consultant_id: Uuid,
        status: ConsultantStatus,
    ) -> Result<Consultant, SupportError> {
        let consultant = self
            .controller
            .set_consultant_status(consultant_id, status, Utc::now())
            .await?;

        if status == ConsultantStatus::Available {
            self.dispatch_waiting().await;
        }

        Ok(consultant)
    }

    /// Re-runs matching over the queue, highest priority first, until either
    /// the queue or the pool of available consultants runs dry. Returns the
    /// number of sessions that were claimed.
    pub async fn dispatch_waiting(&self) -> usize {
        let waiting: Vec<Uuid> = {
            let state = self.store.read().await;
            self.queue.snapshot(&state).iter().map(|s| s.id).collect()
        };

        let mut claimed = 0;
        for session_id in waiting {
            let anyone_available = self
                .store
                .read()
                .await
                .consultants
                .values()
                .any(|c| c.status == ConsultantStatus::Available);
            if !anyone_available {
                break;
            }

            match self.auto_match(session_id).await {
                Ok(Some(_)) => claimed += 1,
                Ok(None) => {}
                Err(SupportError::UpstreamUnavailable(e)) => {
                    error!("Room provisioning down, pausing dispatch at session {}: {}", session_id, e);
                    break;
                }
                Err(e) => debug!("Skipping session {} during dispatch: {}", session_id, e),
            }
        }

        if claimed > 0 {
            info!("Dispatched {} queued sessions", claimed);
        }
        claimed
    }

    /// Cancels connecting sessions that never became active within the
    /// configured timeout. Returns how many were cancelled.
    pub async fn expire_stale_connections(&self, now: DateTime<Utc>) -> usize {
        let cutoff = now - self.connecting_timeout;
        let expired = self.controller.force_cancel_stale(cutoff, now).await;

        for session in &expired {
            if let Some(room_name) = session.room_name.as_deref() {
                self.release_room(room_name).await;
            }
        }
        if !expired.is_empty() {
            info!("Expired {} stale connecting sessions", expired.len());
            self.dispatch_waiting().await;
        }

        expired.len()
    }

    async fn release_room(&self, room_name: &str) {
        match retry_once("destroy_room", || self.rooms.destroy_room(room_name)).await {
            Ok(()) => debug!("Released room {}", room_name),
            Err(RoomError::RoomNotFound { .. }) => debug!("Room {} already gone", room_name),
            Err(e) => error!("Failed to release room {}: {}", room_name, e),
        }
    }

    // ==========================================================================
    // READS
    // ==========================================================================

    pub async fn session(&self, session_id: Uuid) -> Result<SupportSession, SupportError> {
        self.store
            .session(session_id)
            .await
            .ok_or(SupportError::SessionNotFound(session_id))
    }

    /// The user's open session as requester or consultant.
    pub async fn active_for(&self, user_id: Uuid) -> Option<SupportSession> {
        self.store.read().await.open_session_for(user_id).cloned()
    }

    pub async fn queue_snapshot(&self) -> Vec<QueueEntryView> {
        let now = Utc::now();
        let state = self.store.read().await;

        self.queue
            .snapshot(&state)
            .into_iter()
            .enumerate()
            .map(|(index, session)| QueueEntryView {
                session_id: session.id,
                position: index + 1,
                requester_id: session.requester_id,
                requester_name: state.staff_name(session.requester_id).map(str::to_string),
                hospital_id: session.hospital_id,
                hospital_name: state.hospital_name(session.hospital_id).map(str::to_string),
                department: session.department.clone(),
                urgency: session.urgency,
                issue_summary: session.issue_summary.clone(),
                created_at: session.created_at,
                waiting_seconds: session.seconds_waiting(now),
            })
            .collect()
    }

    pub async fn queue_position(&self, session_id: Uuid) -> Result<QueuePosition, SupportError> {
        let state = self.store.read().await;
        self.queue
            .position(&state, session_id, Utc::now())
            .ok_or(SupportError::SessionNotFound(session_id))
    }
}
