use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::ConsultantStatus;

use crate::models::{
    AcceptRequest, ActiveSessionQuery, CancelRequest, ConsultantStatusRequest,
    CreateSupportRequest, EndRequest, JoinRequest, RateRequest,
};
use crate::services::SupportSessionService;

fn required<T>(value: Option<T>, field: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::BadRequest(format!("{} is required", field)))
}

// ==============================================================================
// SUPPORT REQUESTS
// ==============================================================================

/// POST /support/request
#[axum::debug_handler]
pub async fn create_support_request(
    State(service): State<Arc<SupportSessionService>>,
    Json(request): Json<CreateSupportRequest>,
) -> Result<Json<Value>, AppError> {
    let request = request.validate()?;
    info!("Support request from {} ({})", request.requester_id, request.urgency);

    let response = service.create_request(request).await?;
    Ok(Json(json!(response)))
}

/// GET /support/queue
#[axum::debug_handler]
pub async fn get_queue(
    State(service): State<Arc<SupportSessionService>>,
) -> Result<Json<Value>, AppError> {
    let entries = service.queue_snapshot().await;

    Ok(Json(json!({
        "queue": entries,
        "totalInQueue": entries.len()
    })))
}

/// GET /support/queue-position/{session_id}
#[axum::debug_handler]
pub async fn get_queue_position(
    State(service): State<Arc<SupportSessionService>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let position = service.queue_position(session_id).await?;
    Ok(Json(json!(position)))
}

/// GET /support/session/{session_id}
#[axum::debug_handler]
pub async fn get_session(
    State(service): State<Arc<SupportSessionService>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let session = service.session(session_id).await?;
    Ok(Json(json!(session)))
}

/// GET /support/active?userId=
#[axum::debug_handler]
pub async fn get_active_session(
    State(service): State<Arc<SupportSessionService>>,
    Query(query): Query<ActiveSessionQuery>,
) -> Result<Json<Value>, AppError> {
    let user_id = required(query.user_id, "userId")?;
    let session = service.active_for(user_id).await;

    Ok(Json(json!({ "session": session })))
}

// ==============================================================================
// TRANSITIONS
// ==============================================================================

/// POST /support/accept/{session_id}
#[axum::debug_handler]
pub async fn accept_session(
    State(service): State<Arc<SupportSessionService>>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<AcceptRequest>,
) -> Result<Json<Value>, AppError> {
    let consultant_id = required(request.consultant_id, "consultantId")?;
    let outcome = service.accept(session_id, consultant_id).await?;

    Ok(Json(json!({
        "sessionId": outcome.session.id,
        "status": outcome.session.status,
        "roomUrl": outcome.room.room_url,
        "roomName": outcome.room.room_name
    })))
}

/// POST /support/start/{session_id}
#[axum::debug_handler]
pub async fn start_session(
    State(service): State<Arc<SupportSessionService>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let session = service.start(session_id).await?;

    Ok(Json(json!({
        "sessionId": session.id,
        "status": session.status,
        "startedAt": session.started_at
    })))
}

/// POST /support/end/{session_id}
#[axum::debug_handler]
pub async fn end_session(
    State(service): State<Arc<SupportSessionService>>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<EndRequest>,
) -> Result<Json<Value>, AppError> {
    let ended_by = required(request.ended_by, "endedBy")?;
    let session = service
        .end(session_id, ended_by, request.resolution_notes)
        .await?;

    Ok(Json(json!({
        "sessionId": session.id,
        "status": session.status,
        "durationSeconds": session.duration_seconds
    })))
}

/// POST /support/cancel/{session_id}
#[axum::debug_handler]
pub async fn cancel_session(
    State(service): State<Arc<SupportSessionService>>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<CancelRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = required(request.user_id, "userId")?;
    let session = service.cancel(session_id, user_id).await?;

    Ok(Json(json!({
        "sessionId": session.id,
        "status": session.status
    })))
}

/// POST /support/rate/{session_id}
#[axum::debug_handler]
pub async fn rate_session(
    State(service): State<Arc<SupportSessionService>>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<RateRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = required(request.user_id, "userId")?;
    let rating = required(request.rating, "rating")?;
    let session = service
        .rate(session_id, user_id, rating, request.feedback)
        .await?;

    Ok(Json(json!({
        "sessionId": session.id,
        "rating": session.rating,
        "feedback": session.feedback
    })))
}

/// POST /support/join/{session_id}
#[axum::debug_handler]
pub async fn join_session(
    State(service): State<Arc<SupportSessionService>>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<JoinRequest>,
) -> Result<Json<Value>, AppError> {
    let user_id = required(request.user_id, "userId")?;
    let user_name = required(request.user_name, "userName")?;

    let ticket = service
        .join(session_id, user_id, &user_name, request.is_consultant)
        .await?;

    Ok(Json(json!(ticket)))
}

// ==============================================================================
// CONSULTANT PRESENCE
// ==============================================================================

/// POST /consultants/status
#[axum::debug_handler]
pub async fn update_consultant_status(
    State(service): State<Arc<SupportSessionService>>,
    Json(request): Json<ConsultantStatusRequest>,
) -> Result<Json<Value>, AppError> {
    let consultant_id = required(request.consultant_id, "consultantId")?;
    let status = required(request.status, "status")?
        .parse::<ConsultantStatus>()
        .map_err(AppError::BadRequest)?;

    let consultant = service.set_consultant_status(consultant_id, status).await?;

    Ok(Json(json!({
        "consultantId": consultant.id,
        "status": consultant.status,
        "lastSeenAt": consultant.last_seen_at
    })))
}
