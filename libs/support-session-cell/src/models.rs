use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use shared_models::{Consultant, SessionStatus, SupportSession, Urgency};
use video_room_cell::RoomInfo;

use crate::error::SupportError;

// ==============================================================================
// REQUEST BODIES
// ==============================================================================
//
// Fields are optional at the serde level so that a missing field becomes a
// 400 with a readable message instead of an extractor rejection.

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSupportRequest {
    pub requester_id: Option<Uuid>,
    pub hospital_id: Option<Uuid>,
    pub department: Option<String>,
    pub urgency: Option<String>,
    pub issue_summary: Option<String>,
}

/// A create request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSupportRequest {
    pub requester_id: Uuid,
    pub hospital_id: Uuid,
    pub department: String,
    pub urgency: Urgency,
    pub issue_summary: String,
}

impl CreateSupportRequest {
    pub fn validate(self) -> Result<NewSupportRequest, SupportError> {
        let mut missing = Vec::new();
        if self.requester_id.is_none() {
            missing.push("requesterId");
        }
        if self.hospital_id.is_none() {
            missing.push("hospitalId");
        }
        if blank(&self.department) {
            missing.push("department");
        }
        if blank(&self.urgency) {
            missing.push("urgency");
        }
        if blank(&self.issue_summary) {
            missing.push("issueSummary");
        }
        if !missing.is_empty() {
            return Err(SupportError::ValidationError(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let urgency = self
            .urgency
            .unwrap_or_default()
            .parse::<Urgency>()
            .map_err(SupportError::ValidationError)?;

        Ok(NewSupportRequest {
            requester_id: self.requester_id.unwrap_or_default(),
            hospital_id: self.hospital_id.unwrap_or_default(),
            department: self.department.unwrap_or_default().trim().to_string(),
            urgency,
            issue_summary: self.issue_summary.unwrap_or_default().trim().to_string(),
        })
    }
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptRequest {
    pub consultant_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelRequest {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub user_id: Option<Uuid>,
    pub user_name: Option<String>,
    pub is_consultant: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndRequest {
    pub ended_by: Option<Uuid>,
    pub resolution_notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateRequest {
    pub rating: Option<i64>,
    pub feedback: Option<String>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsultantStatusRequest {
    pub consultant_id: Option<Uuid>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSessionQuery {
    pub user_id: Option<Uuid>,
}

// ==============================================================================
// RESULTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueuePosition {
    /// 1-based; `None` once the session has left the queue.
    pub position: Option<usize>,
    pub total_in_queue: usize,
    pub estimated_wait_seconds: Option<i64>,
}

/// Pending session enriched with directory display names.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntryView {
    pub session_id: Uuid,
    pub position: usize,
    pub requester_id: Uuid,
    pub requester_name: Option<String>,
    pub hospital_id: Uuid,
    pub hospital_name: Option<String>,
    pub department: String,
    pub urgency: Urgency,
    pub issue_summary: String,
    pub created_at: DateTime<Utc>,
    pub waiting_seconds: i64,
}

#[derive(Debug, Clone)]
pub struct AcceptOutcome {
    pub session: SupportSession,
    pub room: RoomInfo,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedConsultant {
    pub id: Uuid,
    pub name: String,
}

impl From<&Consultant> for MatchedConsultant {
    fn from(consultant: &Consultant) -> Self {
        Self {
            id: consultant.id,
            name: consultant.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSupportResponse {
    pub session_id: Uuid,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consultant: Option<MatchedConsultant>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_reasons: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinTicket {
    pub token: String,
    pub room_url: String,
    pub room_name: String,
    pub is_owner: bool,
}

// ==============================================================================
// NOTIFICATIONS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SupportTopic {
    QueueChanged,
    ConsultantStatusChanged,
    SessionAccepted,
    SessionStarted,
    SessionEnded,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SupportEvent {
    pub topic: SupportTopic,
    pub session_id: Option<Uuid>,
    pub payload: Value,
    pub timestamp: DateTime<Utc>,
}
