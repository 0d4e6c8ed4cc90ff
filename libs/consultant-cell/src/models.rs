// libs/consultant-cell/src/models.rs
use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_models::{Consultant, ConsultantStatus, Specialty, StaffPreference};

// ==============================================================================
// MATCHING MODELS
// ==============================================================================

/// Winning (or ranked) consultant for a support request.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConsultantMatch {
    pub consultant: Consultant,
    pub score: i32,
    pub reasons: Vec<String>,
}

/// Additive score contributions used by the matching engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchingWeights {
    pub expert: i32,
    pub standard: i32,
    pub relationship: i32,
    pub high_rating: i32,
    pub high_rating_threshold: f64,
    pub favorite: i32,
    pub rotation_penalty: i32,
}

impl Default for MatchingWeights {
    fn default() -> Self {
        Self {
            expert: 30,
            standard: 15,
            relationship: 50,
            high_rating: 20,
            high_rating_threshold: 4.0,
            favorite: 10,
            rotation_penalty: 5,
        }
    }
}

impl MatchingWeights {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            rotation_penalty: config.rotation_penalty_weight,
            ..Self::default()
        }
    }
}

/// Directory data the matching engine scores against: the consultants that
/// are available right now and the requester's preference rows.
#[derive(Debug, Clone, Default)]
pub struct DirectorySnapshot {
    pub available: Vec<Consultant>,
    pub preferences: HashMap<Uuid, StaffPreference>,
}

// ==============================================================================
// DIRECTORY MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultantView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub status: ConsultantStatus,
    pub specialties: Vec<Specialty>,
    pub sessions_today: u32,
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl ConsultantView {
    pub fn from_consultant(consultant: &Consultant, today: NaiveDate) -> Self {
        Self {
            id: consultant.id,
            name: consultant.name.clone(),
            email: consultant.email.clone(),
            status: consultant.status,
            specialties: consultant.specialties.clone(),
            sessions_today: consultant.sessions_on(today),
            last_seen_at: consultant.last_seen_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FavoriteRequest {
    pub staff_id: Option<Uuid>,
    pub consultant_id: Option<Uuid>,
    pub is_favorite: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceView {
    pub staff_id: Uuid,
    pub consultant_id: Uuid,
    pub is_favorite: bool,
    pub successful_sessions: u32,
    pub last_session_at: Option<DateTime<Utc>>,
    pub avg_rating: Option<f64>,
}

impl From<StaffPreference> for PreferenceView {
    fn from(preference: StaffPreference) -> Self {
        Self {
            avg_rating: preference.avg_rating(),
            staff_id: preference.staff_id,
            consultant_id: preference.consultant_id,
            is_favorite: preference.is_favorite,
            successful_sessions: preference.successful_sessions,
            last_session_at: preference.last_session_at,
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DirectoryError {
    #[error("Consultant {0} not found")]
    ConsultantNotFound(Uuid),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::ConsultantNotFound(_) => AppError::NotFound(err.to_string()),
            DirectoryError::ValidationError(msg) => AppError::BadRequest(msg),
        }
    }
}
