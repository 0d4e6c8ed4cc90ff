#![allow(dead_code)]

use std::sync::Arc;

use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::SupportStore;
use shared_models::Urgency;
use shared_utils::test_utils::{TestConfig, TestDirectory};
use support_session_cell::{NewSupportRequest, SupportNotifier, SupportSessionService};
use video_room_cell::{LocalRoomProvider, RoomProvider};

pub struct Harness {
    pub service: Arc<SupportSessionService>,
    pub store: SupportStore,
    pub rooms: LocalRoomProvider,
    pub hospital_id: Uuid,
}

pub fn test_config() -> AppConfig {
    TestConfig::default().to_app_config()
}

pub async fn harness(fixtures: TestDirectory) -> Harness {
    let config = test_config();
    let rooms = LocalRoomProvider::new(&config);
    let (store, hospital_id) = into_store(fixtures).await;
    let service = build_service(store.clone(), Arc::new(rooms.clone()), &config);

    Harness {
        service,
        store,
        rooms,
        hospital_id,
    }
}

pub async fn into_store(fixtures: TestDirectory) -> (SupportStore, Uuid) {
    let hospital_id = fixtures.hospital_id();
    (fixtures.into_store().await, hospital_id)
}

pub fn build_service(
    store: SupportStore,
    rooms: Arc<dyn RoomProvider>,
    config: &AppConfig,
) -> Arc<SupportSessionService> {
    Arc::new(SupportSessionService::new(
        store,
        rooms,
        SupportNotifier::default(),
        config,
    ))
}

pub fn support_request(
    requester_id: Uuid,
    hospital_id: Uuid,
    department: &str,
    urgency: Urgency,
) -> NewSupportRequest {
    NewSupportRequest {
        requester_id,
        hospital_id,
        department: department.to_string(),
        urgency,
        issue_summary: "Patient deteriorating, need a second opinion".to_string(),
    }
}
