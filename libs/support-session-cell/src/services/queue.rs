use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::StoreState;
use shared_models::{QueueKey, SessionStatus, SupportSession, Urgency};

use crate::models::QueuePosition;

/// Per-tier wait used before any session of that tier has been claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitBaselines {
    pub normal: i64,
    pub urgent: i64,
    pub critical: i64,
}

impl WaitBaselines {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            normal: config.default_wait_normal_seconds,
            urgent: config.default_wait_urgent_seconds,
            critical: config.default_wait_critical_seconds,
        }
    }

    pub fn for_tier(&self, urgency: Urgency) -> i64 {
        match urgency {
            Urgency::Normal => self.normal,
            Urgency::Urgent => self.urgent,
            Urgency::Critical => self.critical,
        }
    }
}

impl Default for WaitBaselines {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Mean historical wait of the tier (or its baseline when there is no
/// history) minus what the session has already waited, floored at zero.
pub fn estimated_wait(baseline: i64, mean_wait: Option<i64>, waited_so_far: i64) -> i64 {
    (mean_wait.unwrap_or(baseline) - waited_so_far).max(0)
}

/// Priority queue of pending sessions.
///
/// The queue lives inside the store state so that every operation runs under
/// whichever guard the caller already holds; it never takes locks or notifies
/// on its own.
#[derive(Debug, Clone, Default)]
pub struct QueueManager {
    baselines: WaitBaselines,
}

impl QueueManager {
    pub fn new(baselines: WaitBaselines) -> Self {
        Self { baselines }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(WaitBaselines::from_config(config))
    }

    /// Stores a pending session and returns its 1-based position.
    pub fn enqueue(&self, state: &mut StoreState, session: SupportSession) -> usize {
        debug_assert_eq!(session.status, SessionStatus::Pending);
        let key = QueueKey::of(&session);
        let session_id = session.id;

        state.insert_session(session);
        state.queue.insert(key);

        let position = state.queue.range(..=key).count();
        debug!("Enqueued session {} at position {}/{}", session_id, position, state.queue.len());
        position
    }

    /// Drops the session from the queue index. Returns false if it was not queued.
    pub fn remove(&self, state: &mut StoreState, session_id: Uuid) -> bool {
        let Some(key) = state.sessions.get(&session_id).map(QueueKey::of) else {
            return false;
        };
        let removed = state.queue.remove(&key);
        if removed {
            debug!("Removed session {} from queue", session_id);
        }
        removed
    }

    /// Pending sessions, highest priority first.
    pub fn snapshot<'a>(&self, state: &'a StoreState) -> Vec<&'a SupportSession> {
        state
            .queue
            .iter()
            .filter_map(|key| state.sessions.get(&key.session_id))
            .collect()
    }

    pub fn depth(&self, state: &StoreState) -> usize {
        state.queue.len()
    }

    /// `None` when the session is unknown.
    pub fn position(
        &self,
        state: &StoreState,
        session_id: Uuid,
        now: DateTime<Utc>,
    ) -> Option<QueuePosition> {
        let session = state.sessions.get(&session_id)?;
        let total_in_queue = state.queue.len();

        if session.status != SessionStatus::Pending {
            return Some(QueuePosition {
                position: None,
                total_in_queue,
                estimated_wait_seconds: None,
            });
        }

        let position = state
            .queue
            .iter()
            .position(|key| key.session_id == session_id)
            .map(|index| index + 1);

        let estimate = estimated_wait(
            self.baselines.for_tier(session.urgency),
            state.mean_wait(session.urgency),
            session.seconds_waiting(now),
        );

        Some(QueuePosition {
            position,
            total_in_queue,
            estimated_wait_seconds: Some(estimate),
        })
    }
}
