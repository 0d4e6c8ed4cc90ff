use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use consultant_cell::router::consultant_routes;
use support_session_cell::router::{
    create_consultant_status_router, create_realtime_router, create_support_router,
};
use support_session_cell::SupportSessionService;

pub fn create_router(service: Arc<SupportSessionService>) -> Router {
    let directory = Arc::new(service.directory().clone());

    Router::new()
        .route("/", get(|| async { "Specialist support API is running!" }))
        .route("/health", get(health).with_state(service.clone()))
        .nest("/support", create_support_router(service.clone()))
        .nest(
            "/consultants",
            consultant_routes(directory).merge(create_consultant_status_router(service.clone())),
        )
        .merge(create_realtime_router(service))
}

async fn health(State(service): State<Arc<SupportSessionService>>) -> Json<Value> {
    let rooms_healthy = service.room_provider_healthy().await;

    Json(json!({
        "status": if rooms_healthy { "ok" } else { "degraded" },
        "queueDepth": service.queue_depth().await,
        "roomProvider": service.room_provider_kind(),
        "roomProviderHealthy": rooms_healthy,
        "subscribers": service.notifier().subscriber_count()
    }))
}
