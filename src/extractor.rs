//! Recommendation extraction
//!
//! Mines free-form advisory text for per-bucket adjustment suggestions.
//! Best-effort by design: the input is model prose of unpredictable shape,
//! so extraction runs an ordered battery of pattern families and falls back
//! family by family. The worst case is an empty map, never an error.
//!
//! Family order:
//! 1. explicit transfers ("move NT$X from RRa to RRb"), including the
//!    compound "increase RRb ... by transferring ... from RRa" phrasing
//! 2. directed changes ("increase/decrease RRa by NT$X"), with a
//!    carry-forward scan of the following text for the paired bucket
//! 3. target-value statements ("RRa: NT$X"); two or more are read as a full
//!    target allocation and turned into deltas against the current one
//! 4. bare associations ("NT$X for RRa") as unsigned suggestions
//!
//! A post-pass nudges the result toward zero-sum; see `balance`.

use crate::allocation::Allocation;
use crate::catalog::{Bucket, MIN_UNIT};
use crate::models::RecommendationDelta;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

/// Parsed amounts below the smallest catalog unit are noise, not advice
const NOISE_FLOOR: i64 = MIN_UNIT as i64;

/// Residual tolerated before the balancing pass intervenes
const BALANCE_TOLERANCE: i64 = 1_000;

/// How far past a directed change to scan for its paired bucket
const CARRY_FORWARD_WINDOW: usize = 150;

lazy_static! {
    /// Decorated instructions ("⬆️ Move ...") glued to the previous
    /// sentence; a newline keeps consecutive instructions separable.
    static ref DECORATED: Regex =
        Regex::new(r"([⬆⬇✅]\u{FE0F}?)\s*((?i:move|transfer|shift|reallocate))")
            .expect("decorated pattern");

    /// "increase RRb by NT$X ... by transferring NT$X from RRa"
    static ref COMPOUND_INCREASE: Regex = Regex::new(
        r"(?i)increas(?:e|ing)\s+(RR[1-5])(?:\s+by)?\s+(?:NT\$\s*)?([\d,]+)[\s\S]{0,100}?(?:transferring|moving|reallocating|shifting)\s+(?:NT\$\s*)?[\d,]+\s+(?:from|out of)\s+(RR[1-5])"
    )
    .expect("compound increase pattern");

    /// "move/transfer/shift NT$X from RRa to RRb"
    static ref TRANSFER: Regex = Regex::new(
        r"(?i)\b(?:move|moving|transfer|transferring|reallocate|reallocating|shift|shifting)\s+(?:NT\$\s*)?([\d,]+)\s+(?:from|out of)\s+(RR[1-5])\s+(?:to|into)\s+(RR[1-5])"
    )
    .expect("transfer pattern");

    /// "increase/decrease/reduce [the allocation in] RRa by NT$X"
    static ref DIRECTED_VERB_FIRST: Regex = Regex::new(
        r"(?i)\b(increase|increasing|decrease|decreasing|reduce|reducing)\s+(?:the\s+)?(?:allocation\s+(?:in|of)\s+)?(RR[1-5])(?:\s+by)?\s+(?:NT\$\s*)?([\d,]+)"
    )
    .expect("directed verb-first pattern");

    /// "RRa: increase by NT$X" / "For RRa, reduce NT$X"
    static ref DIRECTED_BUCKET_FIRST: Regex = Regex::new(
        r"(?i)(RR[1-5])(?:\s*:|,)?\s+[^.!?\n]*?(increase|increasing|decrease|decreasing|reduce|reducing)(?:\s+by)?\s+(?:NT\$\s*)?([\d,]+)"
    )
    .expect("directed bucket-first pattern");

    /// Carry-forward: "... by transferring NT$X from RRa"
    static ref CARRY_SOURCE: Regex = Regex::new(
        r"(?i)(?:transferring|moving|reallocating|shifting)\s+(?:NT\$\s*)?[\d,]+\s+(?:from|out of)\s+(RR[1-5])"
    )
    .expect("carry-forward source pattern");

    /// Carry-forward: "... by transferring NT$X to RRb"
    static ref CARRY_TARGET: Regex = Regex::new(
        r"(?i)(?:transferring|moving|reallocating|shifting)\s+(?:NT\$\s*)?[\d,]+\s+(?:to|into)\s+(RR[1-5])"
    )
    .expect("carry-forward target pattern");

    /// "RRa: NT$X", "RRa = NT$X", "RRa → NT$X" read as absolute targets
    static ref TARGET_VALUE: Regex = Regex::new(
        r"(?i)(RR[1-5])(?:\s+(?:to|would be|should be|will be|becomes))?\s*(?::|=|→)\s*(?:NT\$\s*)?([\d,]+)"
    )
    .expect("target value pattern");

    /// "NT$X for/to/in RRa" with no verb at all
    static ref BARE_ASSOCIATION: Regex = Regex::new(
        r"(?i)(?:NT\$\s*)?([\d,]+)\s+(?:(?:for|to|in)\s+)(RR[1-5])"
    )
    .expect("bare association pattern");

    /// "from RRa to RRb" pairs, for filling one-sided suggestions
    static ref FROM_TO_PAIR: Regex =
        Regex::new(r"(?i)(?:from|out of)\s+(RR[1-5])\s+(?:to|into)\s+(RR[1-5])")
            .expect("from-to pair pattern");

    /// A decrease verb followed shortly by a bucket mention
    static ref DECREASE_MENTION: Regex = Regex::new(
        r"(?i)\b(?:decrease|decreasing|reduce|reducing)\b[^.!?\n]{0,80}?(RR[1-5])"
    )
    .expect("decrease mention pattern");

    /// An increase verb followed shortly by a bucket mention
    static ref INCREASE_MENTION: Regex =
        Regex::new(r"(?i)\bincreas(?:e|ing)\b[^.!?\n]{0,80}?(RR[1-5])")
            .expect("increase mention pattern");

    static ref ANY_BUCKET: Regex = Regex::new(r"(?i)RR[1-5]").expect("bucket pattern");
}

/// Extract suggested per-bucket deltas from advisory text.
/// Never fails; unmatched text yields an empty map.
pub fn extract(text: &str, current: &Allocation) -> RecommendationDelta {
    let text = DECORATED.replace_all(text, "\n$1 $2");
    let mut deltas = RecommendationDelta::new();
    // (amount, source, target) triples already applied, so the same move
    // stated twice in two phrasings is counted once
    let mut seen_moves: HashSet<(i64, Bucket, Bucket)> = HashSet::new();
    let mut found = false;

    apply_compound_increases(&text, &mut deltas, &mut seen_moves, &mut found);
    apply_transfers(&text, &mut deltas, &mut seen_moves, &mut found);

    if !found {
        apply_directed_changes(&text, &mut deltas, &mut found);
    }

    if !found {
        apply_target_values(&text, current, &mut deltas, &mut found);
    }

    if !found {
        apply_bare_associations(&text, &mut deltas);
    }

    fill_missing_pairs(&text, &mut deltas);
    balance(&text, &mut deltas);

    deltas.retain(|_, v| *v != 0);
    debug!(?deltas, "extraction complete");
    deltas
}

/// Parse "300,000" / "NT$300,000"-style amount text. Mirrors lenient
/// integer parsing: separators stripped, anything after a period dropped.
fn parse_amount(raw: &str) -> Option<i64> {
    let cleaned = raw.replace(',', "");
    let digits: String = cleaned.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse::<i64>().ok().filter(|&n| n > 0)
}

fn bucket_of(label: &str) -> Bucket {
    // Safe: every capture group that reaches here matched RR[1-5]
    Bucket::from_label(label).expect("regex guarantees a bucket label")
}

fn add(deltas: &mut RecommendationDelta, bucket: Bucket, amount: i64) {
    *deltas.entry(bucket).or_insert(0) += amount;
}

fn apply_compound_increases(
    text: &str,
    deltas: &mut RecommendationDelta,
    seen_moves: &mut HashSet<(i64, Bucket, Bucket)>,
    found: &mut bool,
) {
    for caps in COMPOUND_INCREASE.captures_iter(text) {
        let target = bucket_of(&caps[1]);
        let source = bucket_of(&caps[3]);
        let Some(amount) = parse_amount(&caps[2]) else {
            continue;
        };
        if amount < NOISE_FLOOR || source == target {
            continue;
        }

        add(deltas, target, amount);
        add(deltas, source, -amount);
        seen_moves.insert((amount, source, target));
        *found = true;
    }
}

fn apply_transfers(
    text: &str,
    deltas: &mut RecommendationDelta,
    seen_moves: &mut HashSet<(i64, Bucket, Bucket)>,
    found: &mut bool,
) {
    for caps in TRANSFER.captures_iter(text) {
        let source = bucket_of(&caps[2]);
        let target = bucket_of(&caps[3]);
        let Some(amount) = parse_amount(&caps[1]) else {
            continue;
        };
        if amount < NOISE_FLOOR || source == target {
            continue;
        }
        if !seen_moves.insert((amount, source, target)) {
            continue;
        }

        add(deltas, source, -amount);
        add(deltas, target, amount);
        *found = true;
    }
}

fn apply_directed_changes(text: &str, deltas: &mut RecommendationDelta, found: &mut bool) {
    for caps in DIRECTED_VERB_FIRST.captures_iter(text) {
        let verb = caps[1].to_ascii_lowercase();
        let bucket = bucket_of(&caps[2]);
        let Some(amount) = parse_amount(&caps[3]) else {
            continue;
        };
        if amount < NOISE_FLOOR {
            continue;
        }

        let increase = verb.starts_with("increas");
        add(deltas, bucket, if increase { amount } else { -amount });
        *found = true;

        // Carry-forward: an unpaired change often names its counterpart
        // within the next sentence or two
        let tail_start = caps.get(0).map(|m| m.end()).unwrap_or(0);
        let tail_end = (tail_start + CARRY_FORWARD_WINDOW).min(text.len());
        let tail = clamp_to_char_boundary(text, tail_start, tail_end);

        let carry = if increase {
            CARRY_SOURCE.captures(tail)
        } else {
            CARRY_TARGET.captures(tail)
        };
        if let Some(carry) = carry {
            let partner = bucket_of(&carry[1]);
            if partner != bucket && !deltas.contains_key(&partner) {
                add(deltas, partner, if increase { -amount } else { amount });
            }
        }
    }

    if *found {
        return;
    }

    for caps in DIRECTED_BUCKET_FIRST.captures_iter(text) {
        let bucket = bucket_of(&caps[1]);
        let verb = caps[2].to_ascii_lowercase();
        let Some(amount) = parse_amount(&caps[3]) else {
            continue;
        };
        if amount < NOISE_FLOOR {
            continue;
        }

        let increase = verb.starts_with("increas");
        add(deltas, bucket, if increase { amount } else { -amount });
        *found = true;
    }
}

fn apply_target_values(
    text: &str,
    current: &Allocation,
    deltas: &mut RecommendationDelta,
    found: &mut bool,
) {
    let mut targets: Vec<(Bucket, i64)> = Vec::new();
    for caps in TARGET_VALUE.captures_iter(text) {
        let bucket = bucket_of(&caps[1]);
        let Some(amount) = parse_amount(&caps[2]) else {
            continue;
        };
        if amount < NOISE_FLOOR {
            continue;
        }
        match targets.iter_mut().find(|(b, _)| *b == bucket) {
            Some(entry) => entry.1 = amount,
            None => targets.push((bucket, amount)),
        }
    }

    if targets.len() >= 2 {
        // Two or more absolute statements form a target allocation;
        // deltas are measured against the current one
        for (bucket, target) in targets {
            let difference = target - current.amount(bucket) as i64;
            if difference != 0 {
                add(deltas, bucket, difference);
                *found = true;
            }
        }
    } else if let Some((bucket, amount)) = targets.into_iter().next() {
        // A lone statement degrades to a bare suggestion
        if !deltas.contains_key(&bucket) {
            add(deltas, bucket, amount);
            *found = true;
        }
    }
}

fn apply_bare_associations(text: &str, deltas: &mut RecommendationDelta) {
    for caps in BARE_ASSOCIATION.captures_iter(text) {
        let bucket = bucket_of(&caps[2]);
        let Some(amount) = parse_amount(&caps[1]) else {
            continue;
        };
        if amount < NOISE_FLOOR || deltas.contains_key(&bucket) {
            continue;
        }
        add(deltas, bucket, amount);
    }
}

/// When everything extracted points one way, look for the matching
/// "from RRa to RRb" phrase and credit the other side of the move.
fn fill_missing_pairs(text: &str, deltas: &mut RecommendationDelta) {
    let any_increase = deltas.values().any(|&v| v > 0);
    let any_decrease = deltas.values().any(|&v| v < 0);

    let pairs: Vec<(Bucket, Bucket)> = FROM_TO_PAIR
        .captures_iter(text)
        .map(|caps| (bucket_of(&caps[1]), bucket_of(&caps[2])))
        .collect();

    if any_increase && !any_decrease {
        let increases: Vec<(Bucket, i64)> = deltas
            .iter()
            .filter(|(_, &v)| v > 0)
            .map(|(&b, &v)| (b, v))
            .collect();
        for (target, amount) in increases {
            if let Some((source, _)) = pairs.iter().find(|(_, t)| *t == target) {
                if !deltas.contains_key(source) {
                    add(deltas, *source, -amount);
                }
            }
        }
    } else if any_decrease && !any_increase {
        let decreases: Vec<(Bucket, i64)> = deltas
            .iter()
            .filter(|(_, &v)| v < 0)
            .map(|(&b, &v)| (b, v))
            .collect();
        for (source, amount) in decreases {
            if let Some((_, target)) = pairs.iter().find(|(s, _)| *s == source) {
                if !deltas.contains_key(target) {
                    add(deltas, *target, -amount);
                }
            }
        }
    }
}

/// Best-effort zero-sum correction. With a single entry, the text is
/// scanned for a bucket described with the opposite verb (any other
/// mentioned bucket as a last resort) and it takes the negating amount.
/// With several entries, the largest-magnitude one absorbs the residual.
fn balance(text: &str, deltas: &mut RecommendationDelta) {
    let total: i64 = deltas.values().sum();
    if total.abs() <= BALANCE_TOLERANCE {
        return;
    }

    if deltas.len() == 1 {
        let (&bucket, &amount) = deltas.iter().next().expect("one entry");

        let opposite = if amount > 0 {
            DECREASE_MENTION
                .captures_iter(text)
                .map(|caps| bucket_of(&caps[1]))
                .find(|&b| b != bucket)
        } else {
            INCREASE_MENTION
                .captures_iter(text)
                .map(|caps| bucket_of(&caps[1]))
                .find(|&b| b != bucket)
        };

        let fallback = || {
            ANY_BUCKET
                .find_iter(text)
                .map(|m| bucket_of(m.as_str()))
                .find(|&b| b != bucket)
        };

        if let Some(partner) = opposite.or_else(fallback) {
            deltas.insert(partner, -amount);
        }
    } else if deltas.len() > 1 {
        let largest = deltas
            .iter()
            .max_by_key(|(_, v)| v.abs())
            .map(|(&b, _)| b)
            .expect("non-empty");
        add(deltas, largest, -total);
    }
}

/// Slice `text` on char boundaries nearest the byte range
fn clamp_to_char_boundary(text: &str, start: usize, end: usize) -> &str {
    let mut end = end.min(text.len());
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }
    &text[start..end]
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

    fn default_allocation() -> Allocation {
        allocation([
            (Bucket::RR1, 400_000),
            (Bucket::RR2, 300_000),
            (Bucket::RR3, 300_000),
            (Bucket::RR4, 0),
            (Bucket::RR5, 0),
        ])
    }

    #[test]
    fn test_explicit_transfer_is_zero_sum() {
        let deltas = extract(
            "I suggest you move NT$300,000 from RR1 to RR5 for growth.",
            &default_allocation(),
        );

        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[&Bucket::RR1], -300_000);
        assert_eq!(deltas[&Bucket::RR5], 300_000);
    }

    #[test]
    fn test_compound_increase_with_transfer_source() {
        let deltas = extract(
            "I suggest increasing RR3 by NT$100,000 by transferring NT$100,000 from RR2 to RR3.",
            &default_allocation(),
        );

        assert_eq!(deltas.len(), 2);
        assert_eq!(deltas[&Bucket::RR3], 100_000);
        assert_eq!(deltas[&Bucket::RR2], -100_000);
    }

    #[test]
    fn test_repeated_move_counted_once() {
        let deltas = extract(
            "Move NT$150,000 from RR2 to RR4. To recap: move NT$150,000 from RR2 to RR4.",
            &default_allocation(),
        );

        assert_eq!(deltas[&Bucket::RR2], -150_000);
        assert_eq!(deltas[&Bucket::RR4], 150_000);
    }

    #[test]
    fn test_decorated_instructions_split() {
        let deltas = extract(
            "Here are my recommendations: ⬆️ Move NT$300,000 from RR1 to RR5 ⬆️ Move NT$100,000 from RR3 to RR1",
            &default_allocation(),
        );

        assert_eq!(deltas[&Bucket::RR1], -200_000);
        assert_eq!(deltas[&Bucket::RR3], -100_000);
        assert_eq!(deltas[&Bucket::RR5], 300_000);
    }

    #[test]
    fn test_directed_change_signs() {
        let deltas = extract(
            "You should decrease RR2 by NT$50,000 and increase RR4 by NT$50,000.",
            &default_allocation(),
        );

        assert_eq!(deltas[&Bucket::RR2], -50_000);
        assert_eq!(deltas[&Bucket::RR4], 50_000);
    }

    #[test]
    fn test_directed_increase_carries_forward_source() {
        let deltas = extract(
            "Increase the allocation in RR5 by NT$300,000. Fund this by shifting NT$300,000 out of RR1.",
            &default_allocation(),
        );

        assert_eq!(deltas[&Bucket::RR5], 300_000);
        assert_eq!(deltas[&Bucket::RR1], -300_000);
    }

    #[test]
    fn test_target_values_become_deltas_against_current() {
        let current = default_allocation();
        let deltas = extract(
            "A better structure: RR1: NT$200,000, RR2: NT$300,000, RR3: NT$500,000",
            &current,
        );

        assert_eq!(deltas[&Bucket::RR1], -200_000);
        assert!(!deltas.contains_key(&Bucket::RR2));
        assert_eq!(deltas[&Bucket::RR3], 200_000);
    }

    #[test]
    fn test_noise_floor_discards_small_amounts() {
        let deltas = extract(
            "Maybe move NT$5,000 from RR1 to RR2, it hardly matters.",
            &default_allocation(),
        );
        assert!(deltas.is_empty());
    }

    #[test]
    fn test_unrecognizable_text_yields_empty_map() {
        let deltas = extract(
            "Diversification is the only free lunch in investing. Stay the course!",
            &default_allocation(),
        );
        assert!(deltas.is_empty());
    }

    #[test]
    fn test_single_entry_balanced_against_opposite_verb() {
        let deltas = extract(
            "Increase RR4 by NT$150,000. It also makes sense to reduce your exposure to RR2.",
            &default_allocation(),
        );

        assert_eq!(deltas[&Bucket::RR4], 150_000);
        assert_eq!(deltas[&Bucket::RR2], -150_000);
        let total: i64 = deltas.values().sum();
        assert_eq!(total, 0);
    }

    #[test]
    fn test_residual_lands_on_largest_entry() {
        let deltas = extract(
            "Increase RR3 by NT$300,000, increase RR4 by NT$150,000, and decrease RR1 by NT$100,000.",
            &default_allocation(),
        );

        let total: i64 = deltas.values().sum();
        assert_eq!(total, 0);
        // RR3 was the largest entry and absorbed the residual
        assert_eq!(deltas[&Bucket::RR3], -50_000);
        assert_eq!(deltas[&Bucket::RR4], 150_000);
        assert_eq!(deltas[&Bucket::RR1], -100_000);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("300,000"), Some(300_000));
        assert_eq!(parse_amount("1,000,000"), Some(1_000_000));
        assert_eq!(parse_amount("10000"), Some(10_000));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("0"), None);
    }
}
