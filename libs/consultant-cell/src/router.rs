use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::services::ConsultantDirectory;

/// Directory routes, nested under `/consultants` by the API.
pub fn consultant_routes(directory: Arc<ConsultantDirectory>) -> Router {
    Router::new()
        .route("/", get(handlers::list_consultants))
        .route("/{consultant_id}", get(handlers::get_consultant))
        .route("/favorite", post(handlers::set_favorite))
        .with_state(directory)
}
