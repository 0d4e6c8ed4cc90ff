use chrono::Utc;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupportStore;
use shared_models::{
    Consultant, ConsultantStatus, Hospital, Proficiency, Specialty, StaffMember, StaffPreference,
};

pub const TEST_ROOM_SECRET: &str = "test-room-secret-for-token-signing";

pub struct TestConfig {
    pub room_token_secret: String,
    pub room_api_url: String,
    pub room_api_key: String,
    pub connecting_timeout_seconds: i64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            room_token_secret: TEST_ROOM_SECRET.to_string(),
            room_api_url: "http://localhost:54321/v1".to_string(),
            room_api_key: String::new(),
            connecting_timeout_seconds: 600,
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            room_api_url: self.room_api_url.clone(),
            room_api_key: self.room_api_key.clone(),
            room_domain_url: "https://test.rooms.local".to_string(),
            room_token_secret: self.room_token_secret.clone(),
            connecting_timeout_seconds: self.connecting_timeout_seconds,
            ..AppConfig::default()
        }
    }
}

/// Builder for directory fixtures shared by the cell test suites.
#[derive(Default)]
pub struct TestDirectory {
    pub hospital: Option<Hospital>,
    pub staff: Vec<StaffMember>,
    pub consultants: Vec<Consultant>,
    pub preferences: Vec<StaffPreference>,
}

impl TestDirectory {
    pub fn new() -> Self {
        Self {
            hospital: Some(Hospital {
                id: Uuid::new_v4(),
                name: "Riverside General".to_string(),
            }),
            ..Self::default()
        }
    }

    pub fn hospital_id(&self) -> Uuid {
        self.hospital.as_ref().map(|h| h.id).unwrap_or_else(Uuid::nil)
    }

    pub fn add_staff(&mut self, name: &str) -> Uuid {
        let member = StaffMember {
            id: Uuid::new_v4(),
            name: name.to_string(),
            hospital_id: self.hospital_id(),
        };
        let id = member.id;
        self.staff.push(member);
        id
    }

    pub fn add_consultant(
        &mut self,
        name: &str,
        status: ConsultantStatus,
        specialties: &[(&str, Proficiency)],
    ) -> Uuid {
        let consultant = test_consultant(name, status, specialties);
        let id = consultant.id;
        self.consultants.push(consultant);
        id
    }

    pub fn add_preference(&mut self, preference: StaffPreference) {
        self.preferences.push(preference);
    }

    pub async fn into_store(self) -> SupportStore {
        let store = SupportStore::new();
        if let Some(hospital) = self.hospital {
            store.upsert_hospital(hospital).await;
        }
        for member in self.staff {
            store.upsert_staff(member).await;
        }
        for consultant in self.consultants {
            store.upsert_consultant(consultant).await;
        }
        for preference in self.preferences {
            store.upsert_preference(preference).await;
        }
        store
    }
}

pub fn test_consultant(
    name: &str,
    status: ConsultantStatus,
    specialties: &[(&str, Proficiency)],
) -> Consultant {
    Consultant {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email: format!("{}@example.org", name.to_lowercase().replace(' ', ".")),
        status,
        specialties: specialties
            .iter()
            .map(|(department, proficiency)| Specialty {
                department: department.to_string(),
                proficiency: *proficiency,
            })
            .collect(),
        sessions_today: 0,
        sessions_day: None,
        last_seen_at: Some(Utc::now()),
    }
}

/// Preference row with `sessions` rated sessions averaging `avg_rating`.
pub fn test_preference(
    staff_id: Uuid,
    consultant_id: Uuid,
    sessions: u32,
    avg_rating: u32,
    is_favorite: bool,
) -> StaffPreference {
    StaffPreference {
        staff_id,
        consultant_id,
        is_favorite,
        successful_sessions: sessions,
        last_session_at: if sessions > 0 { Some(Utc::now()) } else { None },
        rating_total: sessions * avg_rating,
    }
}
