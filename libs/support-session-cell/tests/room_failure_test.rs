mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use axum::{body::to_bytes, http::StatusCode, response::IntoResponse};
use serde_json::{json, Value};

use shared_models::error::AppError;
use shared_models::{ConsultantStatus, SessionStatus, Urgency};
use shared_utils::test_utils::TestDirectory;
use support_session_cell::SupportError;
use video_room_cell::{room_name_for, MockRoomProvider, RoomError, RoomInfo};

use common::{build_service, into_store, support_request, test_config};

fn upstream_down() -> RoomError {
    RoomError::ApiError { message: "HTTP 503: upstream down".to_string() }
}

#[tokio::test]
async fn test_room_failure_on_create_is_reported_and_request_stays_queued() {
    let mut fixtures = TestDirectory::new();
    let nurse = fixtures.add_staff("Nurse Achebe");
    let consultant = fixtures.add_consultant("Dr Varga", ConsultantStatus::Available, &[]);
    let (store, hospital_id) = into_store(fixtures).await;

    let mut rooms = MockRoomProvider::new();
    // One failed attempt plus its single retry.
    rooms.expect_create_room().times(2).returning(|_| Err(upstream_down()));

    let service = build_service(store.clone(), Arc::new(rooms), &test_config());
    let err = service
        .create_request(support_request(nurse, hospital_id, "ICU", Urgency::Critical))
        .await
        .unwrap_err();

    let session_id = assert_matches!(
        err.clone(),
        SupportError::RoomProvisioningFailed { session_id, source: RoomError::ApiError { .. } } => session_id
    );

    let session = service.session(session_id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Pending);
    assert_eq!(session.consultant_id, None);
    assert_eq!(service.queue_position(session_id).await.unwrap().position, Some(1));
    assert_eq!(
        store.consultant(consultant).await.unwrap().status,
        ConsultantStatus::Available
    );

    let response = AppError::from(err).into_response();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["sessionId"], json!(session_id));
    assert_eq!(body["status"], "pending");

    // The queued request is still the requester's open session.
    assert_matches!(
        service
            .create_request(support_request(nurse, hospital_id, "ICU", Urgency::Critical))
            .await,
        Err(SupportError::ActiveSessionExists(existing)) if existing == session_id
    );
}

#[tokio::test]
async fn test_manual_accept_surfaces_upstream_failure() {
    let mut fixtures = TestDirectory::new();
    let nurse = fixtures.add_staff("Nurse Achebe");
    let consultant = fixtures.add_consultant("Dr Varga", ConsultantStatus::Offline, &[]);
    let (store, hospital_id) = into_store(fixtures).await;

    let mut rooms = MockRoomProvider::new();
    rooms.expect_create_room().times(2).returning(|_| Err(upstream_down()));

    let service = build_service(store.clone(), Arc::new(rooms), &test_config());
    let created = service
        .create_request(support_request(nurse, hospital_id, "ICU", Urgency::Normal))
        .await
        .unwrap();
    if let Some(c) = store.write().await.consultants.get_mut(&consultant) {
        c.status = ConsultantStatus::Available;
    }

    assert_matches!(
        service.accept(created.session_id, consultant).await,
        Err(SupportError::UpstreamUnavailable(RoomError::ApiError { .. }))
    );

    let session = service.session(created.session_id).await.unwrap();
    assert_eq!(session.status, SessionStatus::Pending);
    assert_eq!(service.queue_position(created.session_id).await.unwrap().position, Some(1));
    assert_eq!(
        store.consultant(consultant).await.unwrap().sessions_today,
        0
    );
}

#[tokio::test]
async fn test_transient_room_failure_is_retried() {
    let mut fixtures = TestDirectory::new();
    let nurse = fixtures.add_staff("Nurse Achebe");
    fixtures.add_consultant("Dr Varga", ConsultantStatus::Available, &[]);
    let (store, hospital_id) = into_store(fixtures).await;

    let mut rooms = MockRoomProvider::new();
    let mut seq = mockall::Sequence::new();
    rooms
        .expect_create_room()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(upstream_down()));
    rooms
        .expect_create_room()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|session_id| {
            Ok(RoomInfo {
                room_url: format!("https://rooms.test/{}", room_name_for(session_id)),
                room_name: room_name_for(session_id),
            })
        });

    let service = build_service(store, Arc::new(rooms), &test_config());
    let created = service
        .create_request(support_request(nurse, hospital_id, "ICU", Urgency::Normal))
        .await
        .unwrap();

    assert_eq!(created.status, SessionStatus::Connecting);
    assert!(created.room_url.unwrap().starts_with("https://rooms.test/support-"));
}

#[tokio::test]
async fn test_end_ignores_missing_room() {
    let mut fixtures = TestDirectory::new();
    let nurse = fixtures.add_staff("Nurse Achebe");
    fixtures.add_consultant("Dr Varga", ConsultantStatus::Available, &[]);
    let (store, hospital_id) = into_store(fixtures).await;

    let mut rooms = MockRoomProvider::new();
    rooms.expect_create_room().returning(|session_id| {
        Ok(RoomInfo {
            room_url: format!("https://rooms.test/{}", room_name_for(session_id)),
            room_name: room_name_for(session_id),
        })
    });
    rooms
        .expect_destroy_room()
        .times(1)
        .returning(|name| Err(RoomError::RoomNotFound { room_name: name.to_string() }));

    let service = build_service(store, Arc::new(rooms), &test_config());
    let created = service
        .create_request(support_request(nurse, hospital_id, "ICU", Urgency::Normal))
        .await
        .unwrap();

    let ended = service.end(created.session_id, nurse, None).await.unwrap();
    assert_eq!(ended.status, SessionStatus::Completed);
}

#[tokio::test]
async fn test_join_token_failure_is_upstream_error() {
    let mut fixtures = TestDirectory::new();
    let nurse = fixtures.add_staff("Nurse Achebe");
    fixtures.add_consultant("Dr Varga", ConsultantStatus::Available, &[]);
    let (store, hospital_id) = into_store(fixtures).await;

    let mut rooms = MockRoomProvider::new();
    rooms.expect_create_room().returning(|session_id| {
        Ok(RoomInfo {
            room_url: format!("https://rooms.test/{}", room_name_for(session_id)),
            room_name: room_name_for(session_id),
        })
    });
    rooms
        .expect_issue_token()
        .times(2)
        .returning(|_, _, _, _| Err(upstream_down()));

    let service = build_service(store, Arc::new(rooms), &test_config());
    let created = service
        .create_request(support_request(nurse, hospital_id, "ICU", Urgency::Normal))
        .await
        .unwrap();

    assert_matches!(
        service.join(created.session_id, nurse, "Nurse Achebe", None).await,
        Err(SupportError::UpstreamUnavailable(_))
    );
    assert_eq!(
        service.session(created.session_id).await.unwrap().status,
        SessionStatus::Connecting
    );
}
