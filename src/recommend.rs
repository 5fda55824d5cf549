//! Fixed model portfolios
//!
//! Deterministic per-persona, per-tier target allocations and the advisory
//! text derived from them. Used when the orchestrator runs in
//! fixed-recommendation mode, where the advisory turn is generated locally
//! instead of asking the model endpoint.

use crate::allocation::{format_amount, Allocation};
use crate::catalog::Bucket;
use crate::models::{Persona, RecommendationDelta, Tier};

/// The target allocation recommended for a persona and tier, RR1..RR5
pub fn model_portfolio(persona: Persona, tier: Tier) -> [(Bucket, u64); 5] {
    use Bucket::*;
    match (persona, tier) {
        (Persona::Introverted, Tier::Low) => {
            [(RR1, 700_000), (RR2, 300_000), (RR3, 0), (RR4, 0), (RR5, 0)]
        }
        (Persona::Introverted, Tier::Moderate) => {
            [(RR1, 0), (RR2, 300_000), (RR3, 400_000), (RR4, 300_000), (RR5, 0)]
        }
        (Persona::Introverted, Tier::High) => {
            [(RR1, 0), (RR2, 0), (RR3, 400_000), (RR4, 300_000), (RR5, 300_000)]
        }
        (Persona::Extroverted, Tier::Low) => {
            [(RR1, 0), (RR2, 400_000), (RR3, 600_000), (RR4, 0), (RR5, 0)]
        }
        (Persona::Extroverted, Tier::Moderate) => {
            [(RR1, 0), (RR2, 0), (RR3, 200_000), (RR4, 300_000), (RR5, 500_000)]
        }
        (Persona::Extroverted, Tier::High) => {
            [(RR1, 0), (RR2, 0), (RR3, 0), (RR4, 400_000), (RR5, 600_000)]
        }
    }
}

/// Differences between the model portfolio and the user's allocation.
/// Unchanged buckets are omitted; an empty map means the allocation
/// already matches the recommended structure.
pub fn fixed_delta(
    persona: Persona,
    tier: Tier,
    current: &Allocation,
) -> RecommendationDelta {
    let mut deltas = RecommendationDelta::new();
    for (bucket, recommended) in model_portfolio(persona, tier) {
        let difference = recommended as i64 - current.amount(bucket) as i64;
        if difference != 0 {
            deltas.insert(bucket, difference);
        }
    }
    deltas
}

/// Persona-toned advisory text for a fixed recommendation set
pub fn advisory_text(persona: Persona, score: u32, deltas: &RecommendationDelta) -> String {
    let mut text = String::new();

    match persona {
        Persona::Introverted => match tier_phrase(score) {
            TierPhrase::Low => text.push_str(&format!(
                "Based on your low risk profile (score: {}), I recommend focusing on conservative investments:\n\n",
                score
            )),
            TierPhrase::Moderate => text.push_str(&format!(
                "Based on your moderate risk profile (score: {}), I recommend a balanced portfolio approach:\n\n",
                score
            )),
            TierPhrase::High => text.push_str(&format!(
                "Based on your high risk profile (score: {}), I recommend a growth-oriented investment strategy:\n\n",
                score
            )),
        },
        Persona::Extroverted => match tier_phrase(score) {
            TierPhrase::Low => text.push_str(&format!(
                "Your risk profile score of {} shows you prefer stability with some growth potential! Here's a portfolio that balances safety with opportunity:\n\n",
                score
            )),
            TierPhrase::Moderate => text.push_str(&format!(
                "With your balanced risk profile (score: {}), you're ready for a dynamic investment approach that can really grow your wealth!\n\n",
                score
            )),
            TierPhrase::High => text.push_str(&format!(
                "Your high risk tolerance (score: {}) opens the door to exceptional growth opportunities! Here's a growth-focused strategy designed for maximum potential returns:\n\n",
                score
            )),
        },
    }

    if deltas.is_empty() {
        text.push_str(
            "✅ Your current allocation already matches the recommended structure for your risk level. Well done.\n",
        );
    } else {
        for (bucket, &amount) in deltas {
            if amount > 0 {
                text.push_str(&format!(
                    "⬆️ Increase {} by NT${}\n",
                    bucket,
                    format_amount(amount as u64)
                ));
            } else {
                text.push_str(&format!(
                    "⬇️ Decrease {} by NT${}\n",
                    bucket,
                    format_amount(amount.unsigned_abs())
                ));
            }
        }
        text.push_str(
            "\nThese adjustments will bring your portfolio in line with the allocation recommended for your risk level, keeping the total at NT$1,000,000.\n",
        );
    }

    text
}

enum TierPhrase {
    Low,
    Moderate,
    High,
}

fn tier_phrase(score: u32) -> TierPhrase {
    // Text selection only; the authoritative mapping lives in ScoreEngine
    if score <= 15 {
        TierPhrase::Low
    } else if score <= 30 {
        TierPhrase::Moderate
    } else {
        TierPhrase::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::AllocationValidator;
    use std::collections::BTreeMap;

    fn allocation(entries: [(Bucket, u64); 5]) -> Allocation {
        let amounts: BTreeMap<Bucket, u64> = entries.into_iter().collect();
        AllocationValidator::validate(&amounts).unwrap()
    }

    #[test]
    fn test_model_portfolios_sum_to_target() {
        for persona in [Persona::Introverted, Persona::Extroverted] {
            for tier in [Tier::Low, Tier::Moderate, Tier::High] {
                let total: u64 = model_portfolio(persona, tier)
                    .iter()
                    .map(|(_, v)| v)
                    .sum();
                assert_eq!(total, 1_000_000, "{:?}/{:?}", persona, tier);
            }
        }
    }

    #[test]
    fn test_model_portfolios_respect_unit_sizes() {
        for persona in [Persona::Introverted, Persona::Extroverted] {
            for tier in [Tier::Low, Tier::Moderate, Tier::High] {
                for (bucket, amount) in model_portfolio(persona, tier) {
                    assert!(
                        amount == 0 || amount % bucket.unit_size() == 0,
                        "{:?}/{:?} {} = {}",
                        persona,
                        tier,
                        bucket,
                        amount
                    );
                }
            }
        }
    }

    #[test]
    fn test_fixed_delta_is_zero_sum() {
        let current = allocation([
            (Bucket::RR1, 1_000_000),
            (Bucket::RR2, 0),
            (Bucket::RR3, 0),
            (Bucket::RR4, 0),
            (Bucket::RR5, 0),
        ]);

        for persona in [Persona::Introverted, Persona::Extroverted] {
            for tier in [Tier::Low, Tier::Moderate, Tier::High] {
                let deltas = fixed_delta(persona, tier, &current);
                let total: i64 = deltas.values().sum();
                assert_eq!(total, 0);
            }
        }
    }

    #[test]
    fn test_matching_allocation_yields_empty_delta() {
        let current = allocation([
            (Bucket::RR1, 700_000),
            (Bucket::RR2, 300_000),
            (Bucket::RR3, 0),
            (Bucket::RR4, 0),
            (Bucket::RR5, 0),
        ]);

        let deltas = fixed_delta(Persona::Introverted, Tier::Low, &current);
        assert!(deltas.is_empty());

        let text = advisory_text(Persona::Introverted, 12, &deltas);
        assert!(text.contains("already matches"));
    }

    #[test]
    fn test_advisory_text_lists_changes() {
        let current = allocation([
            (Bucket::RR1, 1_000_000),
            (Bucket::RR2, 0),
            (Bucket::RR3, 0),
            (Bucket::RR4, 0),
            (Bucket::RR5, 0),
        ]);

        let deltas = fixed_delta(Persona::Introverted, Tier::Low, &current);
        let text = advisory_text(Persona::Introverted, 12, &deltas);
        assert!(text.contains("⬇️ Decrease RR1 by NT$300,000"));
        assert!(text.contains("⬆️ Increase RR2 by NT$300,000"));
    }
}
