use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Normal,
    Urgent,
    Critical,
}

impl Urgency {
    /// Queue rank, lower is served first.
    pub fn rank(&self) -> u8 {
        match self {
            Urgency::Critical => 0,
            Urgency::Urgent => 1,
            Urgency::Normal => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Normal => "normal",
            Urgency::Urgent => "urgent",
            Urgency::Critical => "critical",
        }
    }
}

impl FromStr for Urgency {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "normal" => Ok(Urgency::Normal),
            "urgent" => Ok(Urgency::Urgent),
            "critical" => Ok(Urgency::Critical),
            other => Err(format!("Unknown urgency '{}'", other)),
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Connecting,
    Active,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Cancelled)
    }

    /// Pending, connecting and active sessions all count as open for the requester.
    pub fn is_open(&self) -> bool {
        !self.is_terminal()
    }

    /// A consultant bound to a session in one of these states is busy.
    pub fn binds_consultant(&self) -> bool {
        matches!(self, SessionStatus::Connecting | SessionStatus::Active)
    }

    pub fn can_transition_to(&self, target: &SessionStatus) -> bool {
        use SessionStatus::*;
        match (self, target) {
            (Pending, Connecting) => true,
            (Pending, Cancelled) => true,
            (Connecting, Active) => true,
            (Connecting, Completed) => true,
            (Connecting, Cancelled) => true,
            (Active, Completed) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Connecting => "connecting",
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SupportSession {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub hospital_id: Uuid,
    pub department: String,
    pub urgency: Urgency,
    pub issue_summary: String,
    pub status: SessionStatus,
    pub consultant_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub wait_seconds: Option<i64>,
    pub duration_seconds: Option<i64>,
    pub resolution_notes: Option<String>,
    pub rating: Option<u8>,
    pub feedback: Option<String>,
    pub room_url: Option<String>,
    pub room_name: Option<String>,
    pub ended_by: Option<Uuid>,
    #[serde(default)]
    pub match_reasons: Vec<String>,
}

impl SupportSession {
    pub fn new(
        requester_id: Uuid,
        hospital_id: Uuid,
        department: String,
        urgency: Urgency,
        issue_summary: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            requester_id,
            hospital_id,
            department,
            urgency,
            issue_summary,
            status: SessionStatus::Pending,
            consultant_id: None,
            created_at,
            accepted_at: None,
            started_at: None,
            ended_at: None,
            wait_seconds: None,
            duration_seconds: None,
            resolution_notes: None,
            rating: None,
            feedback: None,
            room_url: None,
            room_name: None,
            ended_by: None,
            match_reasons: Vec::new(),
        }
    }

    pub fn is_requester(&self, user_id: Uuid) -> bool {
        self.requester_id == user_id
    }

    pub fn is_consultant(&self, user_id: Uuid) -> bool {
        self.consultant_id == Some(user_id)
    }

    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.is_requester(user_id) || self.is_consultant(user_id)
    }

    pub fn seconds_waiting(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_seconds().max(0)
    }
}

/// Position key of a pending session: urgency rank, then arrival, then id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueueKey {
    pub rank: u8,
    pub created_at: DateTime<Utc>,
    pub session_id: Uuid,
}

impl QueueKey {
    pub fn of(session: &SupportSession) -> Self {
        Self {
            rank: session.urgency.rank(),
            created_at: session.created_at,
            session_id: session.id,
        }
    }
}
