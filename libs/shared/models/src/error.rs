use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Requester already has an open support session: {0}")]
    ActiveSessionExists(Uuid),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Room unavailable for session {session_id}: {message}")]
    RoomUnavailable { session_id: Uuid, message: String },
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ActiveSessionExists(_) => StatusCode::CONFLICT,
            AppError::ExternalService(_) => StatusCode::BAD_GATEWAY,
            AppError::RoomUnavailable { .. } => StatusCode::BAD_GATEWAY,
        };

        let body = match &self {
            AppError::ActiveSessionExists(session_id) => {
                tracing::warn!("Error: {}: open session {}", status, session_id);
                json!({
                    "error": "You already have an open support request",
                    "existingSessionId": session_id
                })
            }
            AppError::RoomUnavailable { session_id, message } => {
                tracing::error!("Error: {}: {}", status, message);
                json!({
                    "error": message,
                    "sessionId": session_id,
                    "status": "pending"
                })
            }
            AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::ValidationError(msg)
            | AppError::Conflict(msg) => {
                tracing::warn!("Error: {}: {}", status, msg);
                json!({ "error": msg })
            }
            AppError::Internal(msg) | AppError::ExternalService(msg) => {
                tracing::error!("Error: {}: {}", status, msg);
                json!({ "error": msg })
            }
        };

        (status, Json(body)).into_response()
    }
}
