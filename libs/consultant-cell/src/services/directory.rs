// libs/consultant-cell/src/services/directory.rs
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{StoreState, SupportStore};
use shared_models::{local_day, Consultant, StaffPreference};

use crate::models::{ConsultantView, DirectoryError, DirectorySnapshot};

/// Read side of the consultant directory plus the favorite toggle.
#[derive(Debug, Clone)]
pub struct ConsultantDirectory {
    store: SupportStore,
    utc_offset_minutes: i32,
}

impl ConsultantDirectory {
    pub fn new(store: SupportStore, config: &AppConfig) -> Self {
        Self {
            store,
            utc_offset_minutes: config.local_utc_offset_minutes,
        }
    }

    /// Local calendar day used for the rotation counter.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        local_day(now, self.utc_offset_minutes)
    }

    /// Snapshot taken from an already-held store guard.
    pub fn snapshot_from(state: &StoreState, requester_id: Uuid) -> DirectorySnapshot {
        DirectorySnapshot {
            available: state.available_consultants(),
            preferences: state.preferences_of(requester_id),
        }
    }

    pub async fn snapshot_for(&self, requester_id: Uuid) -> DirectorySnapshot {
        let state = self.store.read().await;
        let snapshot = Self::snapshot_from(&state, requester_id);
        debug!(
            "Directory snapshot for {}: {} available, {} preferences",
            requester_id,
            snapshot.available.len(),
            snapshot.preferences.len()
        );
        snapshot
    }

    pub async fn consultant(&self, consultant_id: Uuid) -> Result<Consultant, DirectoryError> {
        self.store
            .consultant(consultant_id)
            .await
            .ok_or(DirectoryError::ConsultantNotFound(consultant_id))
    }

    /// All consultants with live status, sorted by name.
    pub async fn list_consultants(&self) -> Vec<ConsultantView> {
        let today = self.today(Utc::now());
        let state = self.store.read().await;

        let mut views: Vec<ConsultantView> = state
            .consultants
            .values()
            .map(|c| ConsultantView::from_consultant(c, today))
            .collect();
        views.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        views
    }

    pub async fn set_favorite(
        &self,
        staff_id: Uuid,
        consultant_id: Uuid,
        is_favorite: bool,
    ) -> Result<StaffPreference, DirectoryError> {
        let mut state = self.store.write().await;
        if !state.consultants.contains_key(&consultant_id) {
            return Err(DirectoryError::ConsultantNotFound(consultant_id));
        }

        let preference = state.preference_entry(staff_id, consultant_id);
        preference.is_favorite = is_favorite;
        info!(
            "Staff {} {} consultant {}",
            staff_id,
            if is_favorite { "favorited" } else { "unfavorited" },
            consultant_id
        );

        Ok(preference.clone())
    }
}
