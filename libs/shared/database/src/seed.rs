use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use shared_models::{Consultant, Hospital, StaffMember, StaffPreference};

use crate::store::SupportStore;

/// Directory contents loaded at startup. Maintaining these records is the job
/// of the surrounding admin tooling; the engine only reads them.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectorySeed {
    #[serde(default)]
    pub hospitals: Vec<Hospital>,
    #[serde(default)]
    pub staff: Vec<StaffMember>,
    #[serde(default)]
    pub consultants: Vec<Consultant>,
    #[serde(default)]
    pub preferences: Vec<StaffPreference>,
}

impl DirectorySeed {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading directory seed {}", path.display()))?;
        let seed = serde_json::from_str(&raw)
            .with_context(|| format!("parsing directory seed {}", path.display()))?;
        Ok(seed)
    }

    pub async fn apply(self, store: &SupportStore) {
        let mut state = store.write().await;

        info!(
            "Loading directory seed: {} hospitals, {} staff, {} consultants, {} preferences",
            self.hospitals.len(),
            self.staff.len(),
            self.consultants.len(),
            self.preferences.len()
        );

        for hospital in self.hospitals {
            state.hospitals.insert(hospital.id, hospital);
        }
        for member in self.staff {
            state.staff.insert(member.id, member);
        }
        for consultant in self.consultants {
            state.consultants.insert(consultant.id, consultant);
        }
        for preference in self.preferences {
            state
                .preferences
                .insert((preference.staff_id, preference.consultant_id), preference);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use shared_models::{ConsultantStatus, Proficiency};
    use uuid::Uuid;

    #[tokio::test]
    async fn loads_seed_file_into_store() {
        let consultant_id = Uuid::new_v4();
        let staff_id = Uuid::new_v4();
        let hospital_id = Uuid::new_v4();
        let json = serde_json::json!({
            "hospitals": [{ "id": hospital_id, "name": "Northside General" }],
            "staff": [{ "id": staff_id, "name": "Nurse Kim", "hospitalId": hospital_id }],
            "consultants": [{
                "id": consultant_id,
                "name": "Dr. Reyes",
                "email": "reyes@example.org",
                "status": "available",
                "specialties": [{ "department": "Radiology", "proficiency": "expert" }]
            }],
            "preferences": [{ "staffId": staff_id, "consultantId": consultant_id, "isFavorite": true }]
        });

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", json).unwrap();

        let seed = DirectorySeed::from_path(file.path()).unwrap();
        let store = SupportStore::new();
        seed.apply(&store).await;

        let state = store.read().await;
        let consultant = &state.consultants[&consultant_id];
        assert_eq!(consultant.status, ConsultantStatus::Available);
        assert_eq!(consultant.proficiency_in("radiology"), Some(Proficiency::Expert));
        assert_eq!(consultant.sessions_today, 0);
        assert_eq!(state.staff_name(staff_id), Some("Nurse Kim"));
        assert!(state.preferences_of(staff_id)[&consultant_id].is_favorite);
    }

    #[test]
    fn missing_seed_file_is_an_error() {
        let result = DirectorySeed::from_path("/definitely/not/here.json");
        assert!(result.is_err());
    }

    #[test]
    fn bundled_seed_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../../config/directory-seed.json");
        let seed = DirectorySeed::from_path(path).unwrap();
        assert_eq!(seed.hospitals.len(), 2);
        assert!(seed.consultants.iter().all(|c| c.status == ConsultantStatus::Offline));
        assert_eq!(seed.preferences[0].avg_rating(), Some(4.5));
    }
}
