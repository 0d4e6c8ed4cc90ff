// libs/consultant-cell/src/services/matching.rs
use chrono::NaiveDate;
use tracing::debug;

use shared_config::AppConfig;
use shared_models::{Consultant, Proficiency, StaffPreference, SupportSession};

use crate::models::{ConsultantMatch, DirectorySnapshot, MatchingWeights};

pub const REASON_EXPERT: &str = "department expert";
pub const REASON_SPECIALIST: &str = "department specialist";
pub const REASON_RELATIONSHIP: &str = "previous relationship";
pub const REASON_HIGHLY_RATED: &str = "highly rated by requester";
pub const REASON_FAVORITE: &str = "requester favorite";
pub const REASON_ROTATION: &str = "rotation penalty";

/// Scores available consultants against a support request.
///
/// Matching never mutates anything: the caller hands in a snapshot and gets
/// back a ranking, so a lost claim can simply re-run it on fresh data.
#[derive(Debug, Clone, Default)]
pub struct MatchingEngine {
    weights: MatchingWeights,
}

impl MatchingEngine {
    pub fn new(weights: MatchingWeights) -> Self {
        Self { weights }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(MatchingWeights::from_config(config))
    }

    /// Highest-scoring available consultant; ties go to the lowest id.
    pub fn find_match(
        &self,
        session: &SupportSession,
        snapshot: &DirectorySnapshot,
        today: NaiveDate,
    ) -> Option<ConsultantMatch> {
        let best = self.rank(session, snapshot, today).into_iter().next();

        match &best {
            Some(found) => debug!(
                "Best match for session {}: {} (score {}, reasons {:?})",
                session.id, found.consultant.id, found.score, found.reasons
            ),
            None => debug!("No available consultant for session {}", session.id),
        }

        best
    }

    /// Every available consultant, best first.
    pub fn rank(
        &self,
        session: &SupportSession,
        snapshot: &DirectorySnapshot,
        today: NaiveDate,
    ) -> Vec<ConsultantMatch> {
        let mut matches: Vec<ConsultantMatch> = snapshot
            .available
            .iter()
            .map(|consultant| {
                self.score_consultant(
                    consultant,
                    &session.department,
                    snapshot.preferences.get(&consultant.id),
                    today,
                )
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.consultant.id.cmp(&b.consultant.id))
        });
        matches
    }

    pub fn score_consultant(
        &self,
        consultant: &Consultant,
        department: &str,
        preference: Option<&StaffPreference>,
        today: NaiveDate,
    ) -> ConsultantMatch {
        let mut score = 0;
        let mut reasons = Vec::new();

        match consultant.proficiency_in(department) {
            Some(Proficiency::Expert) => {
                score += self.weights.expert;
                reasons.push(REASON_EXPERT.to_string());
            }
            Some(Proficiency::Standard) => {
                score += self.weights.standard;
                reasons.push(REASON_SPECIALIST.to_string());
            }
            None => {}
        }

        if let Some(pref) = preference {
            score += self.weights.relationship;
            reasons.push(REASON_RELATIONSHIP.to_string());

            if pref
                .avg_rating()
                .is_some_and(|avg| avg >= self.weights.high_rating_threshold)
            {
                score += self.weights.high_rating;
                reasons.push(REASON_HIGHLY_RATED.to_string());
            }

            if pref.is_favorite {
                score += self.weights.favorite;
                reasons.push(REASON_FAVORITE.to_string());
            }
        }

        let sessions_today = consultant.sessions_on(today) as i32;
        if sessions_today > 0 {
            score -= sessions_today * self.weights.rotation_penalty;
            reasons.push(REASON_ROTATION.to_string());
        }

        ConsultantMatch {
            consultant: consultant.clone(),
            score,
            reasons,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared_models::{ConsultantStatus, Specialty, Urgency};
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn consultant(id: u128, specialties: &[(&str, Proficiency)]) -> Consultant {
        Consultant {
            id: Uuid::from_u128(id),
            name: format!("Consultant {}", id),
            email: format!("c{}@example.org", id),
            status: ConsultantStatus::Available,
            specialties: specialties
                .iter()
                .map(|(d, p)| Specialty { department: d.to_string(), proficiency: *p })
                .collect(),
            sessions_today: 0,
            sessions_day: None,
            last_seen_at: None,
        }
    }

    fn session(requester: Uuid, department: &str) -> SupportSession {
        SupportSession::new(
            requester,
            Uuid::new_v4(),
            department.to_string(),
            Urgency::Normal,
            "Ventilator settings".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn expert_beats_standard() {
        let engine = MatchingEngine::default();
        let snapshot = DirectorySnapshot {
            available: vec![
                consultant(1, &[("ICU", Proficiency::Standard)]),
                consultant(2, &[("ICU", Proficiency::Expert)]),
            ],
            ..Default::default()
        };

        let best = engine.find_match(&session(Uuid::new_v4(), "icu"), &snapshot, today()).unwrap();
        assert_eq!(best.consultant.id, Uuid::from_u128(2));
        assert_eq!(best.score, 30);
        assert_eq!(best.reasons, vec![REASON_EXPERT.to_string()]);
    }

    #[test]
    fn ties_go_to_lowest_id() {
        let engine = MatchingEngine::default();
        let snapshot = DirectorySnapshot {
            available: vec![consultant(9, &[]), consultant(3, &[]), consultant(5, &[])],
            ..Default::default()
        };

        let ranked = engine.rank(&session(Uuid::new_v4(), "Oncology"), &snapshot, today());
        let ids: Vec<u128> = ranked.iter().map(|m| m.consultant.id.as_u128()).collect();
        assert_eq!(ids, vec![3, 5, 9]);
    }

    #[test]
    fn rotation_penalty_uses_todays_count_only() {
        let engine = MatchingEngine::default();
        let mut busy_today = consultant(1, &[("ICU", Proficiency::Expert)]);
        busy_today.sessions_today = 4;
        busy_today.sessions_day = Some(today());
        let mut busy_yesterday = consultant(2, &[("ICU", Proficiency::Expert)]);
        busy_yesterday.sessions_today = 9;
        busy_yesterday.sessions_day = today().pred_opt();

        let penalised = engine.score_consultant(&busy_today, "ICU", None, today());
        assert_eq!(penalised.score, 10);
        assert!(penalised.reasons.contains(&REASON_ROTATION.to_string()));

        let fresh = engine.score_consultant(&busy_yesterday, "ICU", None, today());
        assert_eq!(fresh.score, 30);
    }

    #[test]
    fn relationship_bonuses_stack() {
        let engine = MatchingEngine::default();
        let requester = Uuid::new_v4();
        let c = consultant(1, &[]);
        let mut pref = StaffPreference::new(requester, c.id);
        pref.is_favorite = true;
        pref.record_rated_session(5, Utc::now());
        pref.record_rated_session(4, Utc::now());

        let scored = engine.score_consultant(&c, "ICU", Some(&pref), today());
        assert_eq!(scored.score, 80);
        assert_eq!(
            scored.reasons,
            vec![
                REASON_RELATIONSHIP.to_string(),
                REASON_HIGHLY_RATED.to_string(),
                REASON_FAVORITE.to_string()
            ]
        );
    }

    #[test]
    fn low_rating_earns_only_relationship() {
        let engine = MatchingEngine::default();
        let c = consultant(1, &[]);
        let mut pref = StaffPreference::new(Uuid::new_v4(), c.id);
        pref.record_rated_session(3, Utc::now());

        assert_eq!(engine.score_consultant(&c, "ICU", Some(&pref), today()).score, 50);
    }

    #[test]
    fn penalty_weight_is_configurable() {
        let engine = MatchingEngine::new(MatchingWeights { rotation_penalty: 12, ..Default::default() });
        let mut c = consultant(1, &[]);
        c.record_acceptance(today());

        assert_eq!(engine.score_consultant(&c, "ICU", None, today()).score, -12);
    }

    #[test]
    fn empty_pool_has_no_match() {
        let engine = MatchingEngine::default();
        let snapshot = DirectorySnapshot::default();
        assert!(engine.find_match(&session(Uuid::new_v4(), "ICU"), &snapshot, today()).is_none());
    }
}
