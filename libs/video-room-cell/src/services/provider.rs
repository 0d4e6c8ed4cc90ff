// libs/video-room-cell/src/services/provider.rs
use std::future::Future;

use async_trait::async_trait;
use tracing::{error, warn};
use uuid::Uuid;

use crate::models::{RoomError, RoomInfo};

/// Room names are derived from the session id so that concurrent attempts to
/// provision the same session converge on one room.
pub fn room_name_for(session_id: Uuid) -> String {
    format!("support-{}", session_id.simple())
}

/// External collaborator that owns ephemeral video rooms.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait RoomProvider: Send + Sync {
    /// Create (or return the existing) room for a support session.
    async fn create_room(&self, session_id: Uuid) -> Result<RoomInfo, RoomError>;

    /// Issue an access token for one participant of the session's room.
    async fn issue_token(
        &self,
        session_id: Uuid,
        participant_id: Uuid,
        participant_name: &str,
        is_owner: bool,
    ) -> Result<String, RoomError>;

    async fn destroy_room(&self, room_name: &str) -> Result<(), RoomError>;

    /// Whether the provider can currently provision rooms.
    async fn health_check(&self) -> Result<bool, RoomError>;

    /// Short label used in logs and health output.
    fn kind(&self) -> &'static str;
}

/// Run a provider call, retrying once on a transient failure.
pub async fn retry_once<T, F, Fut>(operation: &str, mut call: F) -> Result<T, RoomError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RoomError>>,
{
    match call().await {
        Ok(value) => Ok(value),
        Err(e) if e.is_retryable() => {
            warn!("{} failed, retrying once: {}", operation, e);
            call().await.map_err(|e| {
                error!("{} failed after retry: {}", operation, e);
                e
            })
        }
        Err(e) => Err(e),
    }
}
