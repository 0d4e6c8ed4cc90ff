use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::services::{websocket_handler, SupportSessionService};

/// Session lifecycle routes, nested under `/support`.
pub fn create_support_router(service: Arc<SupportSessionService>) -> Router {
    Router::new()
        .route("/request", post(handlers::create_support_request))
        .route("/queue", get(handlers::get_queue))
        .route("/queue-position/{session_id}", get(handlers::get_queue_position))
        .route("/active", get(handlers::get_active_session))
        .route("/session/{session_id}", get(handlers::get_session))
        .route("/accept/{session_id}", post(handlers::accept_session))
        .route("/start/{session_id}", post(handlers::start_session))
        .route("/end/{session_id}", post(handlers::end_session))
        .route("/cancel/{session_id}", post(handlers::cancel_session))
        .route("/rate/{session_id}", post(handlers::rate_session))
        .route("/join/{session_id}", post(handlers::join_session))
        .with_state(service)
}

/// Presence route, merged into `/consultants` next to the directory routes.
pub fn create_consultant_status_router(service: Arc<SupportSessionService>) -> Router {
    Router::new()
        .route("/status", post(handlers::update_consultant_status))
        .with_state(service)
}

/// WebSocket stream of notifier events.
pub fn create_realtime_router(service: Arc<SupportSessionService>) -> Router {
    Router::new()
        .route("/ws", get(websocket_handler))
        .with_state(service)
}
