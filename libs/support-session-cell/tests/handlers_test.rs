mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use shared_models::ConsultantStatus;
use shared_utils::test_utils::TestDirectory;
use support_session_cell::router::{create_consultant_status_router, create_support_router};

use common::{harness, Harness};

fn app(h: &Harness) -> Router {
    Router::new()
        .nest("/support", create_support_router(h.service.clone()))
        .nest("/consultants", create_consultant_status_router(h.service.clone()))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn request_body(requester: Uuid, hospital: Uuid, urgency: &str) -> Value {
    json!({
        "requesterId": requester,
        "hospitalId": hospital,
        "department": "Neurology",
        "urgency": urgency,
        "issueSummary": "Sudden onset aphasia"
    })
}

#[tokio::test]
async fn test_create_request_missing_fields() {
    let h = harness(TestDirectory::new()).await;
    let (status, body) = send(
        app(&h),
        post_json("/support/request", json!({ "requesterId": Uuid::new_v4() })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("hospitalId"));
}

#[tokio::test]
async fn test_create_request_duplicate_returns_existing_id() {
    let mut fixtures = TestDirectory::new();
    let nurse = fixtures.add_staff("Nurse Achebe");
    let h = harness(fixtures).await;

    let (status, first) = send(
        app(&h),
        post_json("/support/request", request_body(nurse, h.hospital_id, "urgent")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["status"], "pending");
    assert_eq!(first["queuePosition"], 1);
    assert!(first.get("consultant").is_none());

    let (status, second) = send(
        app(&h),
        post_json("/support/request", request_body(nurse, h.hospital_id, "critical")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(second["existingSessionId"], first["sessionId"]);
}

#[tokio::test]
async fn test_create_request_matched() {
    let mut fixtures = TestDirectory::new();
    let nurse = fixtures.add_staff("Nurse Achebe");
    let consultant = fixtures.add_consultant("Dr Varga", ConsultantStatus::Available, &[]);
    let h = harness(fixtures).await;

    let (status, body) = send(
        app(&h),
        post_json("/support/request", request_body(nurse, h.hospital_id, "normal")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "connecting");
    assert_eq!(body["consultant"]["id"], json!(consultant));
    assert!(body["roomUrl"].as_str().unwrap().contains("support-"));
    assert!(body["matchReasons"].is_array());
}

#[tokio::test]
async fn test_queue_listing_includes_display_names() {
    let mut fixtures = TestDirectory::new();
    let nurse = fixtures.add_staff("Nurse Achebe");
    let h = harness(fixtures).await;

    send(
        app(&h),
        post_json("/support/request", request_body(nurse, h.hospital_id, "normal")),
    )
    .await;

    let (status, body) = send(app(&h), get("/support/queue")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalInQueue"], 1);
    assert_eq!(body["queue"][0]["requesterName"], "Nurse Achebe");
    assert_eq!(body["queue"][0]["hospitalName"], "Riverside General");
    assert_eq!(body["queue"][0]["urgency"], "normal");
}

#[tokio::test]
async fn test_queue_position_unknown_session() {
    let h = harness(TestDirectory::new()).await;
    let (status, _) = send(
        app(&h),
        get(&format!("/support/queue-position/{}", Uuid::new_v4())),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_accept_race_loser_gets_conflict() {
    let mut fixtures = TestDirectory::new();
    let nurse = fixtures.add_staff("Nurse Achebe");
    let first = fixtures.add_consultant("Dr One", ConsultantStatus::Offline, &[]);
    let second = fixtures.add_consultant("Dr Two", ConsultantStatus::Offline, &[]);
    let h = harness(fixtures).await;

    let (_, created) = send(
        app(&h),
        post_json("/support/request", request_body(nurse, h.hospital_id, "urgent")),
    )
    .await;
    let session_id = created["sessionId"].as_str().unwrap().to_string();
    {
        let mut state = h.store.write().await;
        for id in [first, second] {
            if let Some(c) = state.consultants.get_mut(&id) {
                c.status = ConsultantStatus::Available;
            }
        }
    }

    let uri = format!("/support/accept/{}", session_id);
    let (status, body) = send(app(&h), post_json(&uri, json!({ "consultantId": first }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessionId"], json!(session_id));
    assert!(body["roomName"].as_str().unwrap().starts_with("support-"));

    let (status, _) = send(app(&h), post_json(&uri, json!({ "consultantId": second }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        app(&h),
        post_json(
            &format!("/support/accept/{}", Uuid::new_v4()),
            json!({ "consultantId": second }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_session_flow_over_http() {
    let mut fixtures = TestDirectory::new();
    let nurse = fixtures.add_staff("Nurse Achebe");
    let consultant = fixtures.add_consultant("Dr Varga", ConsultantStatus::Available, &[]);
    let h = harness(fixtures).await;

    let (_, created) = send(
        app(&h),
        post_json("/support/request", request_body(nurse, h.hospital_id, "critical")),
    )
    .await;
    let id = created["sessionId"].as_str().unwrap().to_string();

    let (status, active) = send(app(&h), get(&format!("/support/active?userId={}", consultant))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active["session"]["id"], json!(id));

    let (status, ticket) = send(
        app(&h),
        post_json(
            &format!("/support/join/{}", id),
            json!({ "userId": consultant, "userName": "Dr Varga", "isConsultant": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(ticket["token"].as_str().is_some());
    assert_eq!(ticket["roomUrl"], created["roomUrl"]);

    let (status, _) = send(
        app(&h),
        post_json(
            &format!("/support/join/{}", id),
            json!({ "userId": Uuid::new_v4(), "userName": "Stranger" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let start = Request::builder()
        .method("POST")
        .uri(format!("/support/start/{}", id))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app(&h), start).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");

    let (status, _) = send(
        app(&h),
        post_json(&format!("/support/cancel/{}", id), json!({ "userId": nurse })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        app(&h),
        post_json(
            &format!("/support/end/{}", id),
            json!({ "endedBy": consultant, "resolutionNotes": "tPA window confirmed" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");

    let rate_uri = format!("/support/rate/{}", id);
    let (status, body) = send(
        app(&h),
        post_json(&rate_uri, json!({ "rating": 4, "feedback": "Quick and clear", "userId": nurse })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rating"], 4);

    let (status, _) = send(
        app(&h),
        post_json(&rate_uri, json!({ "rating": 5, "userId": nurse })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, session) = send(app(&h), get(&format!("/support/session/{}", id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["resolutionNotes"], "tPA window confirmed");
    assert_eq!(session["feedback"], "Quick and clear");

    let (status, active) = send(app(&h), get(&format!("/support/active?userId={}", nurse))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(active["session"], Value::Null);
}

#[tokio::test]
async fn test_cancel_by_non_requester_is_forbidden() {
    let mut fixtures = TestDirectory::new();
    let nurse = fixtures.add_staff("Nurse Achebe");
    let h = harness(fixtures).await;

    let (_, created) = send(
        app(&h),
        post_json("/support/request", request_body(nurse, h.hospital_id, "normal")),
    )
    .await;
    let uri = format!("/support/cancel/{}", created["sessionId"].as_str().unwrap());

    let (status, _) = send(app(&h), post_json(&uri, json!({ "userId": Uuid::new_v4() }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(app(&h), post_json(&uri, json!({ "userId": nurse }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let (status, _) = send(
        app(&h),
        post_json(
            &format!("/support/cancel/{}", Uuid::new_v4()),
            json!({ "userId": nurse }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_consultant_status_endpoint() {
    let mut fixtures = TestDirectory::new();
    let consultant = fixtures.add_consultant("Dr Varga", ConsultantStatus::Offline, &[]);
    let h = harness(fixtures).await;

    let (status, body) = send(
        app(&h),
        post_json(
            "/consultants/status",
            json!({ "consultantId": consultant, "status": "available" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "available");

    for invalid in ["busy", "sleeping"] {
        let (status, _) = send(
            app(&h),
            post_json(
                "/consultants/status",
                json!({ "consultantId": consultant, "status": invalid }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "status {}", invalid);
    }

    let (status, _) = send(
        app(&h),
        post_json(
            "/consultants/status",
            json!({ "consultantId": Uuid::new_v4(), "status": "away" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
