// libs/video-room-cell/src/services/local.rs
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_utils::room_token::{sign_room_token, RoomTokenClaims};

use crate::models::{RoomError, RoomInfo};
use crate::services::provider::{room_name_for, RoomProvider};

/// In-process room provider: rooms live in memory and tokens are HMAC-signed
/// with the configured secret. Used when no rooms API key is configured.
#[derive(Clone)]
pub struct LocalRoomProvider {
    domain_url: String,
    token_secret: String,
    token_ttl_seconds: i64,
    rooms: Arc<RwLock<HashMap<String, RoomInfo>>>,
}

impl LocalRoomProvider {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            domain_url: config.room_domain_url.trim_end_matches('/').to_string(),
            token_secret: config.room_token_secret.clone(),
            token_ttl_seconds: config.room_token_ttl_seconds,
            rooms: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn has_room(&self, room_name: &str) -> bool {
        self.rooms.read().await.contains_key(room_name)
    }
}

#[async_trait]
impl RoomProvider for LocalRoomProvider {
    async fn create_room(&self, session_id: Uuid) -> Result<RoomInfo, RoomError> {
        let room_name = room_name_for(session_id);
        let mut rooms = self.rooms.write().await;

        let room = rooms
            .entry(room_name.clone())
            .or_insert_with(|| {
                info!("Provisioning local room {}", room_name);
                RoomInfo {
                    room_url: format!("{}/{}", self.domain_url, room_name),
                    room_name: room_name.clone(),
                }
            })
            .clone();

        Ok(room)
    }

    async fn issue_token(
        &self,
        session_id: Uuid,
        participant_id: Uuid,
        participant_name: &str,
        is_owner: bool,
    ) -> Result<String, RoomError> {
        let room_name = room_name_for(session_id);
        if !self.has_room(&room_name).await {
            return Err(RoomError::RoomNotFound { room_name });
        }

        let now = Utc::now();
        let claims = RoomTokenClaims {
            room: room_name,
            sub: participant_id.to_string(),
            name: Some(participant_name.to_string()),
            owner: is_owner,
            iat: now.timestamp(),
            exp: (now + Duration::seconds(self.token_ttl_seconds)).timestamp(),
        };

        debug!("Signing local room token for {} (owner: {})", participant_id, is_owner);
        sign_room_token(&claims, &self.token_secret)
            .map_err(|message| RoomError::TokenError { message })
    }

    async fn destroy_room(&self, room_name: &str) -> Result<(), RoomError> {
        match self.rooms.write().await.remove(room_name) {
            Some(_) => {
                info!("Destroyed local room {}", room_name);
                Ok(())
            }
            None => Err(RoomError::RoomNotFound {
                room_name: room_name.to_string(),
            }),
        }
    }

    async fn health_check(&self) -> Result<bool, RoomError> {
        Ok(true)
    }

    fn kind(&self) -> &'static str {
        "local"
    }
}
