// libs/video-room-cell/src/services/mod.rs

pub mod daily;
pub mod local;
pub mod provider;

use std::sync::Arc;

use tracing::{info, warn};

use shared_config::AppConfig;

pub use daily::DailyRoomClient;
pub use local::LocalRoomProvider;
pub use provider::{retry_once, room_name_for, RoomProvider};

/// Pick the rooms API client when it is configured, the local provider otherwise.
pub fn build_room_provider(config: &AppConfig) -> Arc<dyn RoomProvider> {
    match DailyRoomClient::new(config) {
        Ok(client) => {
            info!("Using rooms API at {}", config.room_api_url);
            Arc::new(client)
        }
        Err(e) => {
            warn!("{} - falling back to local room provider", e);
            Arc::new(LocalRoomProvider::new(config))
        }
    }
}
