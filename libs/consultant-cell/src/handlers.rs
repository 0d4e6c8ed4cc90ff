use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{ConsultantView, FavoriteRequest, PreferenceView};
use crate::services::ConsultantDirectory;

#[axum::debug_handler]
pub async fn list_consultants(
    State(directory): State<Arc<ConsultantDirectory>>,
) -> Result<Json<Value>, AppError> {
    let consultants = directory.list_consultants().await;
    debug!("Listing {} consultants", consultants.len());

    Ok(Json(json!({
        "consultants": consultants,
        "total": consultants.len()
    })))
}

#[axum::debug_handler]
pub async fn get_consultant(
    State(directory): State<Arc<ConsultantDirectory>>,
    Path(consultant_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let consultant = directory.consultant(consultant_id).await?;
    let view = ConsultantView::from_consultant(&consultant, directory.today(Utc::now()));

    Ok(Json(json!(view)))
}

#[axum::debug_handler]
pub async fn set_favorite(
    State(directory): State<Arc<ConsultantDirectory>>,
    Json(request): Json<FavoriteRequest>,
) -> Result<Json<Value>, AppError> {
    let (Some(staff_id), Some(consultant_id), Some(is_favorite)) =
        (request.staff_id, request.consultant_id, request.is_favorite)
    else {
        return Err(AppError::BadRequest(
            "staffId, consultantId and isFavorite are required".to_string(),
        ));
    };

    let preference = directory
        .set_favorite(staff_id, consultant_id, is_favorite)
        .await?;

    Ok(Json(json!({
        "preference": PreferenceView::from(preference)
    })))
}
