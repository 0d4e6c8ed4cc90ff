use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsultantStatus {
    Online,
    Available,
    Busy,
    Away,
    #[default]
    Offline,
}

impl ConsultantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultantStatus::Online => "online",
            ConsultantStatus::Available => "available",
            ConsultantStatus::Busy => "busy",
            ConsultantStatus::Away => "away",
            ConsultantStatus::Offline => "offline",
        }
    }
}

impl FromStr for ConsultantStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "online" => Ok(ConsultantStatus::Online),
            "available" => Ok(ConsultantStatus::Available),
            "busy" => Ok(ConsultantStatus::Busy),
            "away" => Ok(ConsultantStatus::Away),
            "offline" => Ok(ConsultantStatus::Offline),
            other => Err(format!("Unknown consultant status '{}'", other)),
        }
    }
}

impl fmt::Display for ConsultantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Proficiency {
    Standard,
    Expert,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Specialty {
    pub department: String,
    pub proficiency: Proficiency,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Consultant {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub status: ConsultantStatus,
    #[serde(default)]
    pub specialties: Vec<Specialty>,
    #[serde(default)]
    pub sessions_today: u32,
    #[serde(default)]
    pub sessions_day: Option<NaiveDate>,
    #[serde(default)]
    pub last_seen_at: Option<DateTime<Utc>>,
}

impl Consultant {
    /// Session count for `day`; a counter recorded on an earlier day reads as zero.
    pub fn sessions_on(&self, day: NaiveDate) -> u32 {
        if self.sessions_day == Some(day) {
            self.sessions_today
        } else {
            0
        }
    }

    pub fn record_acceptance(&mut self, day: NaiveDate) {
        if self.sessions_day != Some(day) {
            self.sessions_day = Some(day);
            self.sessions_today = 0;
        }
        self.sessions_today += 1;
    }

    /// Highest proficiency held in `department`, compared case-insensitively.
    pub fn proficiency_in(&self, department: &str) -> Option<Proficiency> {
        self.specialties
            .iter()
            .filter(|s| s.department.eq_ignore_ascii_case(department.trim()))
            .map(|s| s.proficiency)
            .max()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StaffPreference {
    pub staff_id: Uuid,
    pub consultant_id: Uuid,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub successful_sessions: u32,
    #[serde(default)]
    pub last_session_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rating_total: u32,
}

impl StaffPreference {
    pub fn new(staff_id: Uuid, consultant_id: Uuid) -> Self {
        Self {
            staff_id,
            consultant_id,
            is_favorite: false,
            successful_sessions: 0,
            last_session_at: None,
            rating_total: 0,
        }
    }

    pub fn avg_rating(&self) -> Option<f64> {
        if self.successful_sessions == 0 {
            None
        } else {
            Some(self.rating_total as f64 / self.successful_sessions as f64)
        }
    }

    pub fn record_rated_session(&mut self, rating: u8, at: DateTime<Utc>) {
        self.successful_sessions += 1;
        self.rating_total += rating as u32;
        self.last_session_at = Some(at);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StaffMember {
    pub id: Uuid,
    pub name: String,
    pub hospital_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hospital {
    pub id: Uuid,
    pub name: String,
}

/// Calendar day at the service's local offset.
pub fn local_day(at: DateTime<Utc>, utc_offset_minutes: i32) -> NaiveDate {
    (at + Duration::minutes(utc_offset_minutes as i64)).date_naive()
}
