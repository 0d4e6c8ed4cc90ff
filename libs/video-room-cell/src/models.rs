// libs/video-room-cell/src/models.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A provisioned video room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    pub room_url: String,
    pub room_name: String,
}

// ==============================================================================
// ROOMS API WIRE FORMAT
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct CreateRoomRequest {
    pub name: String,
    pub privacy: String,
    pub properties: RoomProperties,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomProperties {
    pub enable_chat: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomResponse {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeetingTokenRequest {
    pub properties: MeetingTokenProperties,
}

#[derive(Debug, Clone, Serialize)]
pub struct MeetingTokenProperties {
    pub room_name: String,
    pub user_id: String,
    pub user_name: String,
    pub is_owner: bool,
    pub exp: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeetingTokenResponse {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: Option<String>,
    pub info: Option<String>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoomError {
    #[error("Room provisioning not configured")]
    NotConfigured,

    #[error("Room not found: {room_name}")]
    RoomNotFound { room_name: String },

    #[error("Rooms API error: {message}")]
    ApiError { message: String },

    #[error("Token error: {message}")]
    TokenError { message: String },
}

impl RoomError {
    /// Transient failures worth a second attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RoomError::ApiError { .. })
    }
}

impl From<reqwest::Error> for RoomError {
    fn from(err: reqwest::Error) -> Self {
        RoomError::ApiError {
            message: err.to_string(),
        }
    }
}
