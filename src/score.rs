//! Questionnaire scoring
//!
//! Pure sum of 1-indexed option choices, mapped onto the three risk tiers.
//! A score outside the 10-50 band (a partial or foreign answer sequence)
//! is an explicit error, never a silently defaulted tier.

use crate::error::{AdvisorError, Result};
use crate::models::Tier;

pub struct ScoreEngine;

impl ScoreEngine {
    /// Sum the 1-indexed choices. Deterministic and side-effect free.
    pub fn score(answers: &[u8]) -> u32 {
        answers.iter().map(|&choice| choice as u32).sum()
    }

    /// Map a score onto its tier. Inclusive bands: Low 10-15,
    /// Moderate 16-30, High 31-50.
    pub fn tier(score: u32) -> Result<Tier> {
        match score {
            10..=15 => Ok(Tier::Low),
            16..=30 => Ok(Tier::Moderate),
            31..=50 => Ok(Tier::High),
            _ => Err(AdvisorError::ScoreOutOfRange(score)),
        }
    }
}
