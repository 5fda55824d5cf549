//! Core data models for the advisory chat engine

use crate::allocation::Allocation;
use crate::catalog::Bucket;
use crate::transcript::MessageLog;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

//
// ================= Enums =================
//

/// Conversation domain selected at settings time
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Vertical {
    Chat,
    Investment,
    Insurance,
}

/// Dialogue style; changes phrasing and product tables, never control flow
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Persona {
    Introverted,
    Extroverted,
}

/// Coarse risk classification derived from the questionnaire score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Low,
    Moderate,
    High,
}

//
// ================= Stage =================
//

/// Conversation state machine position.
///
/// Investment chain:
/// `AwaitingSettings → Questionnaire(i) → ProductIntro → FirstAllocation →
/// RecommendationReview ⇄ FreeChat → FinalAllocation → Completed`.
///
/// Insurance chain:
/// `AwaitingSettings → PlanChoice → Questionnaire(i) → PlanConfirmation →
/// FreeChat → PlanChoiceFinal → Completed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    AwaitingSettings,
    PlanChoice,
    Questionnaire { index: usize },
    ProductIntro,
    FirstAllocation,
    RecommendationReview,
    FreeChat,
    PlanConfirmation,
    FinalAllocation,
    PlanChoiceFinal,
    Completed,
}

//
// ================= Recommendation Delta =================
//

/// Signed per-bucket adjustments mined from advisory text.
/// Best-effort: may be partial, empty, or unbalanced.
pub type RecommendationDelta = BTreeMap<Bucket, i64>;

//
// ================= Settings =================
//

/// Settings submitted to start (or restart) a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SessionSettings {
    pub vertical: Vertical,
    pub persona: Persona,
}

//
// ================= Session =================
//

/// The per-user conversation. One live `Session` per conversation; a
/// settings resubmission replaces it wholesale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: Uuid,
    pub vertical: Vertical,
    pub persona: Persona,
    pub stage: Stage,
    pub log: MessageLog,
    /// 1-indexed option choices, one per answered question
    pub questionnaire_answers: Vec<u8>,
    pub risk_score: Option<u32>,
    pub tier: Option<Tier>,
    pub allocation: Option<Allocation>,
    pub recommended_delta: RecommendationDelta,
    pub chosen_plan: Option<String>,
    /// One-way flag; once true no transition is permitted
    pub is_finalized: bool,
    /// True while a model call is in flight for this session
    pub busy: bool,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a fresh session for the given settings. All conversation
    /// state starts empty; the orchestrator emits the greeting.
    pub fn new(session_id: Uuid, settings: SessionSettings) -> Self {
        Self {
            session_id,
            vertical: settings.vertical,
            persona: settings.persona,
            stage: Stage::AwaitingSettings,
            log: MessageLog::new(),
            questionnaire_answers: Vec::new(),
            risk_score: None,
            tier: None,
            allocation: None,
            recommended_delta: RecommendationDelta::new(),
            chosen_plan: None,
            is_finalized: false,
            busy: false,
            created_at: Utc::now(),
        }
    }

    /// Whether the first allocation round has completed
    pub fn has_allocation(&self) -> bool {
        self.allocation.is_some()
    }

    /// Pre-seed for the final allocation round: the first-round allocation
    /// with the recommended deltas applied, floored at zero per bucket.
    /// Empty until the first allocation exists.
    pub fn seeded_final_allocation(&self) -> BTreeMap<Bucket, u64> {
        let Some(allocation) = &self.allocation else {
            return BTreeMap::new();
        };

        Bucket::ALL
            .iter()
            .map(|&bucket| {
                let current = allocation.amount(bucket) as i64;
                let delta = self.recommended_delta.get(&bucket).copied().unwrap_or(0);
                (bucket, current.saturating_add(delta).max(0) as u64)
            })
            .collect()
    }
}

//
// ================= Display =================
//

impl fmt::Display for Vertical {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Vertical::Chat => "Chat",
            Vertical::Investment => "Investment",
            Vertical::Insurance => "Insurance",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Persona::Introverted => "Introverted",
            Persona::Extroverted => "Extroverted",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::Low => "Low",
            Tier::Moderate => "Moderate",
            Tier::High => "High",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::AllocationValidator;

    fn fresh_session() -> Session {
        Session::new(
            Uuid::new_v4(),
            SessionSettings {
                vertical: Vertical::Investment,
                persona: Persona::Introverted,
            },
        )
    }

    #[test]
    fn test_new_session_is_blank() {
        let session = fresh_session();
        assert_eq!(session.stage, Stage::AwaitingSettings);
        assert!(!session.is_finalized);
        assert!(!session.busy);
        assert!(session.questionnaire_answers.is_empty());
        assert!(session.recommended_delta.is_empty());
    }

    #[test]
    fn test_seeded_final_allocation_applies_delta() {
        let mut session = fresh_session();

        let amounts: BTreeMap<Bucket, u64> = [
            (Bucket::RR1, 700_000),
            (Bucket::RR2, 300_000),
            (Bucket::RR3, 0),
            (Bucket::RR4, 0),
            (Bucket::RR5, 0),
        ]
        .into_iter()
        .collect();
        session.allocation = Some(AllocationValidator::validate(&amounts).unwrap());
        session.recommended_delta.insert(Bucket::RR1, -300_000);
        session.recommended_delta.insert(Bucket::RR5, 300_000);

        let seeded = session.seeded_final_allocation();
        assert_eq!(seeded[&Bucket::RR1], 400_000);
        assert_eq!(seeded[&Bucket::RR2], 300_000);
        assert_eq!(seeded[&Bucket::RR5], 300_000);
    }

    #[test]
    fn test_seeded_final_allocation_floors_at_zero() {
        let mut session = fresh_session();

        let amounts: BTreeMap<Bucket, u64> = Bucket::ALL
            .iter()
            .map(|&b| (b, if b == Bucket::RR1 { 1_000_000 } else { 0 }))
            .collect();
        session.allocation = Some(AllocationValidator::validate(&amounts).unwrap());
        session.recommended_delta.insert(Bucket::RR2, -50_000);

        let seeded = session.seeded_final_allocation();
        assert_eq!(seeded[&Bucket::RR2], 0);
    }

    #[test]
    fn test_seeded_final_allocation_empty_before_first_round() {
        let session = fresh_session();
        assert!(session.seeded_final_allocation().is_empty());
    }
}
