// libs/video-room-cell/src/lib.rs
//! # Video Room Cell
//!
//! Room provisioning for support sessions. The engine consumes the
//! [`RoomProvider`] trait only:
//!
//! - `create_room(session_id)` - one ephemeral room per support session
//! - `issue_token(session_id, participant_id, name, is_owner)` - per-participant access
//! - `destroy_room(room_name)` - release when the session ends
//!
//! Two implementations ship with the cell:
//!
//! - [`DailyRoomClient`] talks to a Daily-style REST rooms API
//!   (`ROOM_API_URL`, `ROOM_API_KEY`)
//! - [`LocalRoomProvider`] keeps rooms in memory and signs tokens with
//!   `ROOM_TOKEN_SECRET`; used when no API key is configured
//!
//! Calls are wrapped in [`retry_once`] by the caller: transient API errors get
//! one more attempt, anything else surfaces immediately.

pub mod models;
pub mod services;

pub use models::{RoomError, RoomInfo};

#[cfg(any(test, feature = "mock"))]
pub use services::provider::MockRoomProvider;
pub use services::{
    build_room_provider, retry_once, room_name_for, DailyRoomClient, LocalRoomProvider,
    RoomProvider,
};
