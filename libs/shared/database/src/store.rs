use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;
use uuid::Uuid;

use shared_models::{
    Consultant, ConsultantStatus, Hospital, QueueKey, StaffMember, StaffPreference, SupportSession,
    Urgency,
};

/// Running wait-time aggregate of one urgency tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WaitStats {
    pub total_seconds: i64,
    pub count: i64,
}

impl WaitStats {
    pub fn record(&mut self, wait_seconds: i64) {
        self.total_seconds += wait_seconds;
        self.count += 1;
    }

    /// Rounded mean, `None` before the first claim.
    pub fn mean(&self) -> Option<i64> {
        (self.count > 0).then(|| (self.total_seconds as f64 / self.count as f64).round() as i64)
    }
}

/// Arena of every record the support engine touches, keyed by id.
///
/// Readers take a shared guard; every mutation happens under the single write
/// guard, which is what makes predicate-checked updates atomic.
///
/// `sessions` keeps history for lookups and ratings. Hot-path reads go
/// through `open` (non-terminal session ids) and `wait_stats` instead, so
/// they stay proportional to live work.
#[derive(Debug, Default)]
pub struct StoreState {
    pub sessions: HashMap<Uuid, SupportSession>,
    pub consultants: HashMap<Uuid, Consultant>,
    pub preferences: HashMap<(Uuid, Uuid), StaffPreference>,
    pub staff: HashMap<Uuid, StaffMember>,
    pub hospitals: HashMap<Uuid, Hospital>,
    /// Ordered index of pending sessions.
    pub queue: BTreeSet<QueueKey>,
    /// Ids of pending, connecting and active sessions.
    pub open: HashSet<Uuid>,
    pub wait_stats: HashMap<Urgency, WaitStats>,
}

impl StoreState {
    /// Stores a session, indexing it as open unless it is already terminal.
    pub fn insert_session(&mut self, session: SupportSession) {
        if session.status.is_open() {
            self.open.insert(session.id);
        } else {
            self.open.remove(&session.id);
        }
        self.sessions.insert(session.id, session);
    }

    /// Drops the session from the open index once it reaches a terminal state.
    pub fn close_session(&mut self, session_id: Uuid) {
        self.open.remove(&session_id);
    }

    pub fn open_sessions(&self) -> impl Iterator<Item = &SupportSession> {
        self.open.iter().filter_map(|id| self.sessions.get(id))
    }

    /// The requester's pending, connecting or active request, if any.
    pub fn open_request_for(&self, requester_id: Uuid) -> Option<&SupportSession> {
        self.open_sessions().find(|s| s.requester_id == requester_id)
    }

    /// Open session where the user is either requester or bound consultant.
    pub fn open_session_for(&self, user_id: Uuid) -> Option<&SupportSession> {
        self.open_request_for(user_id)
            .or_else(|| self.open_sessions().find(|s| s.consultant_id == Some(user_id)))
    }

    pub fn binding_session(&self, consultant_id: Uuid) -> Option<&SupportSession> {
        self.open_sessions()
            .find(|s| s.consultant_id == Some(consultant_id) && s.status.binds_consultant())
    }

    pub fn available_consultants(&self) -> Vec<Consultant> {
        self.consultants
            .values()
            .filter(|c| c.status == ConsultantStatus::Available)
            .cloned()
            .collect()
    }

    /// The staff member's preference rows keyed by consultant id.
    pub fn preferences_of(&self, staff_id: Uuid) -> HashMap<Uuid, StaffPreference> {
        self.preferences
            .values()
            .filter(|p| p.staff_id == staff_id)
            .map(|p| (p.consultant_id, p.clone()))
            .collect()
    }

    /// Creates the row on first touch.
    pub fn preference_entry(&mut self, staff_id: Uuid, consultant_id: Uuid) -> &mut StaffPreference {
        self.preferences
            .entry((staff_id, consultant_id))
            .or_insert_with(|| {
                debug!("Creating preference row for staff {} / consultant {}", staff_id, consultant_id);
                StaffPreference::new(staff_id, consultant_id)
            })
    }

    pub fn record_wait(&mut self, urgency: Urgency, wait_seconds: i64) {
        self.wait_stats.entry(urgency).or_default().record(wait_seconds);
    }

    /// Mean wait of claimed sessions in the tier.
    pub fn mean_wait(&self, urgency: Urgency) -> Option<i64> {
        self.wait_stats.get(&urgency).and_then(WaitStats::mean)
    }

    pub fn staff_name(&self, staff_id: Uuid) -> Option<&str> {
        self.staff.get(&staff_id).map(|s| s.name.as_str())
    }

    pub fn hospital_name(&self, hospital_id: Uuid) -> Option<&str> {
        self.hospitals.get(&hospital_id).map(|h| h.name.as_str())
    }
}

#[derive(Debug, Clone, Default)]
pub struct SupportStore {
    inner: Arc<RwLock<StoreState>>,
}

impl SupportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.inner.read().await
    }

    pub async fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.inner.write().await
    }

    pub async fn session(&self, session_id: Uuid) -> Option<SupportSession> {
        self.read().await.sessions.get(&session_id).cloned()
    }

    pub async fn consultant(&self, consultant_id: Uuid) -> Option<Consultant> {
        self.read().await.consultants.get(&consultant_id).cloned()
    }

    pub async fn upsert_consultant(&self, consultant: Consultant) {
        let mut state = self.write().await;
        debug!("Upserting consultant {}", consultant.id);
        state.consultants.insert(consultant.id, consultant);
    }

    pub async fn upsert_staff(&self, staff: StaffMember) {
        self.write().await.staff.insert(staff.id, staff);
    }

    pub async fn upsert_hospital(&self, hospital: Hospital) {
        self.write().await.hospitals.insert(hospital.id, hospital);
    }

    pub async fn upsert_preference(&self, preference: StaffPreference) {
        self.write()
            .await
            .preferences
            .insert((preference.staff_id, preference.consultant_id), preference);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared_models::SessionStatus;

    fn session(requester: Uuid, status: SessionStatus) -> SupportSession {
        let mut s = SupportSession::new(
            requester,
            Uuid::new_v4(),
            "Cardiology".to_string(),
            Urgency::Urgent,
            "Arrhythmia on telemetry".to_string(),
            Utc::now(),
        );
        s.status = status;
        s
    }

    #[test]
    fn open_request_ignores_terminal_sessions() {
        let requester = Uuid::new_v4();
        let mut state = StoreState::default();
        let done = session(requester, SessionStatus::Completed);
        state.insert_session(done);
        assert!(state.open_request_for(requester).is_none());

        let open = session(requester, SessionStatus::Pending);
        let open_id = open.id;
        state.insert_session(open);
        assert_eq!(state.open_request_for(requester).map(|s| s.id), Some(open_id));

        state.close_session(open_id);
        assert!(state.open_request_for(requester).is_none());
        assert!(state.sessions.contains_key(&open_id));
    }

    #[test]
    fn binding_session_only_sees_connecting_or_active() {
        let consultant = Uuid::new_v4();
        let mut state = StoreState::default();
        let mut connecting = session(Uuid::new_v4(), SessionStatus::Connecting);
        connecting.consultant_id = Some(consultant);
        let connecting_id = connecting.id;
        state.insert_session(connecting);

        assert_eq!(state.binding_session(consultant).map(|s| s.id), Some(connecting_id));
        assert_eq!(state.open_session_for(consultant).map(|s| s.id), Some(connecting_id));

        state.close_session(connecting_id);
        assert!(state.binding_session(consultant).is_none());
    }

    #[test]
    fn preference_entry_is_created_once() {
        let mut state = StoreState::default();
        let (staff, consultant) = (Uuid::new_v4(), Uuid::new_v4());
        state.preference_entry(staff, consultant).is_favorite = true;
        state.preference_entry(staff, consultant).successful_sessions += 1;

        assert_eq!(state.preferences.len(), 1);
        let prefs = state.preferences_of(staff);
        assert!(prefs[&consultant].is_favorite);
        assert_eq!(prefs[&consultant].successful_sessions, 1);
    }

    #[test]
    fn mean_wait_is_tracked_per_tier() {
        let mut state = StoreState::default();
        assert_eq!(state.mean_wait(Urgency::Urgent), None);

        state.record_wait(Urgency::Urgent, 60);
        state.record_wait(Urgency::Urgent, 91);
        state.record_wait(Urgency::Critical, 10);

        assert_eq!(state.mean_wait(Urgency::Urgent), Some(76));
        assert_eq!(state.mean_wait(Urgency::Critical), Some(10));
        assert_eq!(state.mean_wait(Urgency::Normal), None);
    }

    #[tokio::test]
    async fn store_clones_share_state() {
        let store = SupportStore::new();
        let clone = store.clone();
        let hospital = Hospital { id: Uuid::new_v4(), name: "St. Mary's".to_string() };
        let hospital_id = hospital.id;
        clone.upsert_hospital(hospital).await;

        assert_eq!(store.read().await.hospital_name(hospital_id), Some("St. Mary's"));
    }
}
