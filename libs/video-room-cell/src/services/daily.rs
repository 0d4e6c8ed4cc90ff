// libs/video-room-cell/src/services/daily.rs
use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;

use crate::models::{
    ApiErrorBody, CreateRoomRequest, MeetingTokenProperties, MeetingTokenRequest,
    MeetingTokenResponse, RoomError, RoomInfo, RoomProperties, RoomResponse,
};
use crate::services::provider::{room_name_for, RoomProvider};

/// Client for a Daily-style REST rooms API.
/// Rooms: POST/GET/DELETE {base}/rooms, tokens: POST {base}/meeting-tokens
pub struct DailyRoomClient {
    client: Client,
    api_url: String,
    api_key: String,
    token_ttl_seconds: i64,
}

impl DailyRoomClient {
    pub fn new(config: &AppConfig) -> Result<Self, RoomError> {
        if !config.is_room_provisioning_configured() {
            return Err(RoomError::NotConfigured);
        }

        Ok(Self {
            client: Client::new(),
            api_url: config.room_api_url.trim_end_matches('/').to_string(),
            api_key: config.room_api_key.clone(),
            token_ttl_seconds: config.room_token_ttl_seconds,
        })
    }

    /// Fetch an existing room by name.
    /// GET /rooms/{name}
    pub async fn get_room(&self, room_name: &str) -> Result<RoomInfo, RoomError> {
        let url = format!("{}/rooms/{}", self.api_url, room_name);
        debug!("Fetching room from: {}", url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RoomError::RoomNotFound {
                room_name: room_name.to_string(),
            });
        }

        let response_text = response.text().await?;
        if !status.is_success() {
            error!("Rooms API get failed: {} - {}", status, response_text);
            return Err(RoomError::ApiError {
                message: format!("HTTP {}: {}", status, response_text),
            });
        }

        let room: RoomResponse = parse_body(&response_text, "room")?;
        Ok(RoomInfo {
            room_url: room.url,
            room_name: room.name,
        })
    }
}

#[async_trait]
impl RoomProvider for DailyRoomClient {
    /// POST /rooms, falling back to GET when the room already exists.
    /// Rooms carry no expiry: the engine destroys them when the session ends.
    async fn create_room(&self, session_id: Uuid) -> Result<RoomInfo, RoomError> {
        let room_name = room_name_for(session_id);
        info!("Creating room {} for support session {}", room_name, session_id);

        let url = format!("{}/rooms", self.api_url);
        let request_body = CreateRoomRequest {
            name: room_name.clone(),
            privacy: "private".to_string(),
            properties: RoomProperties { enable_chat: true },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;
        debug!("Rooms API create response: {} - {}", status, response_text);

        if status == StatusCode::BAD_REQUEST && is_already_exists(&response_text) {
            debug!("Room {} already exists, reusing it", room_name);
            return self.get_room(&room_name).await;
        }

        if !status.is_success() {
            error!("Rooms API create failed: {} - {}", status, response_text);
            return Err(RoomError::ApiError {
                message: format!("HTTP {}: {}", status, response_text),
            });
        }

        let room: RoomResponse = parse_body(&response_text, "room")?;
        info!("Room {} ready at {}", room.name, room.url);
        Ok(RoomInfo {
            room_url: room.url,
            room_name: room.name,
        })
    }

    /// POST /meeting-tokens
    async fn issue_token(
        &self,
        session_id: Uuid,
        participant_id: Uuid,
        participant_name: &str,
        is_owner: bool,
    ) -> Result<String, RoomError> {
        let url = format!("{}/meeting-tokens", self.api_url);
        let request_body = MeetingTokenRequest {
            properties: MeetingTokenProperties {
                room_name: room_name_for(session_id),
                user_id: participant_id.to_string(),
                user_name: participant_name.to_string(),
                is_owner,
                exp: (Utc::now() + Duration::seconds(self.token_ttl_seconds)).timestamp(),
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            error!("Rooms API token request failed: {} - {}", status, response_text);
            return Err(RoomError::ApiError {
                message: format!("HTTP {}: {}", status, response_text),
            });
        }

        let token: MeetingTokenResponse = parse_body(&response_text, "meeting token")?;
        debug!("Issued meeting token for {} in session {}", participant_id, session_id);
        Ok(token.token)
    }

    /// DELETE /rooms/{name}
    async fn destroy_room(&self, room_name: &str) -> Result<(), RoomError> {
        let url = format!("{}/rooms/{}", self.api_url, room_name);
        info!("Destroying room {}", room_name);

        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RoomError::RoomNotFound {
                room_name: room_name.to_string(),
            });
        }
        if !status.is_success() {
            let response_text = response.text().await?;
            error!("Rooms API delete failed: {} - {}", status, response_text);
            return Err(RoomError::ApiError {
                message: format!("HTTP {}: {}", status, response_text),
            });
        }

        Ok(())
    }

    /// GET /rooms?limit=1
    async fn health_check(&self) -> Result<bool, RoomError> {
        let url = format!("{}/rooms", self.api_url);
        let response = self
            .client
            .get(&url)
            .query(&[("limit", "1")])
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let healthy = response.status().is_success();
        if !healthy {
            warn!("Rooms API health check failed: {}", response.status());
        }
        Ok(healthy)
    }

    fn kind(&self) -> &'static str {
        "daily"
    }
}

fn is_already_exists(body: &str) -> bool {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.info)
        .map(|info| info.contains("already exists"))
        .unwrap_or(false)
}

fn parse_body<T: serde::de::DeserializeOwned>(body: &str, what: &str) -> Result<T, RoomError> {
    serde_json::from_str(body).map_err(|e| RoomError::ApiError {
        message: format!("Failed to parse {} response: {}", what, e),
    })
}
