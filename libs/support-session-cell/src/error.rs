use thiserror::Error;
use uuid::Uuid;

use shared_models::error::AppError;
use shared_models::SessionStatus;
use video_room_cell::RoomError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SupportError {
    #[error("Support session {0} not found")]
    SessionNotFound(Uuid),

    #[error("Consultant {0} not found")]
    ConsultantNotFound(Uuid),

    #[error("Requester already has an open support session: {0}")]
    ActiveSessionExists(Uuid),

    #[error("Session {session_id} is no longer pending or consultant {consultant_id} is no longer available")]
    ClaimConflict { session_id: Uuid, consultant_id: Uuid },

    #[error("Session {0} has already been rated")]
    AlreadyRated(Uuid),

    #[error("Invalid session status transition from {from} to {to}")]
    InvalidTransition { from: SessionStatus, to: SessionStatus },

    #[error("Session {session_id} is {status}; only connecting or active sessions can be joined")]
    NotJoinable { session_id: Uuid, status: SessionStatus },

    #[error("Consultant {0} is bound to an open session and cannot change status")]
    ConsultantBound(Uuid),

    #[error("{0}")]
    Forbidden(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Room provisioning unavailable: {0}")]
    UpstreamUnavailable(#[from] RoomError),

    /// Raised by request creation: the session exists and stays queued.
    #[error("Room provisioning failed for session {session_id}, request remains queued: {source}")]
    RoomProvisioningFailed { session_id: Uuid, source: RoomError },
}

impl From<SupportError> for AppError {
    fn from(err: SupportError) -> Self {
        match err {
            SupportError::SessionNotFound(_) | SupportError::ConsultantNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            SupportError::ActiveSessionExists(existing) => AppError::ActiveSessionExists(existing),
            SupportError::ClaimConflict { .. } | SupportError::AlreadyRated(_) => {
                AppError::Conflict(err.to_string())
            }
            SupportError::InvalidTransition { .. }
            | SupportError::NotJoinable { .. }
            | SupportError::ConsultantBound(_) => AppError::BadRequest(err.to_string()),
            SupportError::Forbidden(msg) => AppError::Forbidden(msg),
            SupportError::ValidationError(msg) => AppError::ValidationError(msg),
            SupportError::UpstreamUnavailable(_) => AppError::ExternalService(err.to_string()),
            SupportError::RoomProvisioningFailed { session_id, .. } => AppError::RoomUnavailable {
                session_id,
                message: err.to_string(),
            },
        }
    }
}
