//! Allocation validation
//!
//! Enforces the domain invariants on a monetary allocation map: full bucket
//! coverage, per-bucket unit-size multiples, and an exact target total.
//! Violations are descriptive and always locally recoverable; the
//! orchestrator re-prompts rather than failing the session.

use crate::catalog::{Bucket, TARGET_TOTAL};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A validated allocation: every bucket present, every amount a legal
/// multiple, total exactly NT$1,000,000. Construct via
/// [`AllocationValidator::validate`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Allocation {
    amounts: BTreeMap<Bucket, u64>,
}

impl Allocation {
    pub fn amount(&self, bucket: Bucket) -> u64 {
        self.amounts.get(&bucket).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Bucket, u64)> + '_ {
        self.amounts.iter().map(|(&b, &v)| (b, v))
    }

    pub fn total(&self) -> u64 {
        self.amounts.values().sum()
    }

    /// Render as the `RR1: NT$400,000` list used in prompts
    pub fn describe(&self) -> String {
        self.iter()
            .map(|(bucket, amount)| format!("- {}: NT${}", bucket, format_amount(amount)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Group digits of an amount with thousands separators
pub fn format_amount(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

//
// ================= Validation =================
//

/// A specific rule violation, naming the rule and the bucket at fault
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationViolation {
    /// The bucket has no entry at all. Distinct from an explicit zero,
    /// which is valid.
    MissingBucket(Bucket),
    /// The amount is neither 0 nor a positive multiple of the unit size
    NotUnitMultiple {
        bucket: Bucket,
        amount: u64,
        unit: u64,
    },
    /// Amounts do not sum to the target total
    TotalMismatch { total: u64 },
}

impl fmt::Display for AllocationViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllocationViolation::MissingBucket(bucket) => {
                write!(
                    f,
                    "{} has no entry; enter a value (0 is allowed) for every category",
                    bucket
                )
            }
            AllocationViolation::NotUnitMultiple {
                bucket,
                amount,
                unit,
            } => write!(
                f,
                "{}: NT${} must be 0 or a multiple of the NT${} unit size",
                bucket,
                format_amount(*amount),
                format_amount(*unit)
            ),
            AllocationViolation::TotalMismatch { total } => write!(
                f,
                "the total must be exactly NT${} (currently NT${})",
                format_amount(TARGET_TOTAL),
                format_amount(*total)
            ),
        }
    }
}

pub struct AllocationValidator;

impl AllocationValidator {
    /// Validate a raw allocation map against the catalog. Rules are checked
    /// in order: full coverage, unit multiples, exact total.
    pub fn validate(
        amounts: &BTreeMap<Bucket, u64>,
    ) -> std::result::Result<Allocation, AllocationViolation> {
        for bucket in Bucket::ALL {
            if !amounts.contains_key(&bucket) {
                return Err(AllocationViolation::MissingBucket(bucket));
            }
        }

        for bucket in Bucket::ALL {
            let amount = amounts[&bucket];
            let unit = bucket.unit_size();
            if amount != 0 && amount % unit != 0 {
                return Err(AllocationViolation::NotUnitMultiple {
                    bucket,
                    amount,
                    unit,
                });
            }
        }

        let total: u64 = amounts.values().sum();
        if total != TARGET_TOTAL {
            return Err(AllocationViolation::TotalMismatch { total });
        }

        Ok(Allocation {
            amounts: amounts.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full(entries: [(Bucket, u64); 5]) -> BTreeMap<Bucket, u64> {
        entries.into_iter().collect()
    }

    #[test]
    fn test_valid_allocation() {
        let amounts = full([
            (Bucket::RR1, 700_000),
            (Bucket::RR2, 300_000),
            (Bucket::RR3, 0),
            (Bucket::RR4, 0),
            (Bucket::RR5, 0),
        ]);

        let allocation = AllocationValidator::validate(&amounts).unwrap();
        assert_eq!(allocation.total(), TARGET_TOTAL);
        assert_eq!(allocation.amount(Bucket::RR1), 700_000);
    }

    #[test]
    fn test_missing_bucket_is_not_zero() {
        // RR3-RR5 absent entirely
        let amounts: BTreeMap<Bucket, u64> =
            [(Bucket::RR1, 700_001), (Bucket::RR2, 299_999)]
                .into_iter()
                .collect();

        let err = AllocationValidator::validate(&amounts).unwrap_err();
        assert_eq!(err, AllocationViolation::MissingBucket(Bucket::RR3));
    }

    #[test]
    fn test_non_multiple_rejected() {
        let amounts = full([
            (Bucket::RR1, 700_001),
            (Bucket::RR2, 299_999),
            (Bucket::RR3, 0),
            (Bucket::RR4, 0),
            (Bucket::RR5, 0),
        ]);

        let err = AllocationValidator::validate(&amounts).unwrap_err();
        assert!(matches!(
            err,
            AllocationViolation::NotUnitMultiple {
                bucket: Bucket::RR1,
                ..
            }
        ));
    }

    #[test]
    fn test_total_mismatch_rejected() {
        let amounts = full([
            (Bucket::RR1, 500_000),
            (Bucket::RR2, 300_000),
            (Bucket::RR3, 100_000),
            (Bucket::RR4, 0),
            (Bucket::RR5, 0),
        ]);

        let err = AllocationValidator::validate(&amounts).unwrap_err();
        assert_eq!(err, AllocationViolation::TotalMismatch { total: 900_000 });
    }

    #[test]
    fn test_zero_entry_is_valid() {
        let amounts = full([
            (Bucket::RR1, 0),
            (Bucket::RR2, 0),
            (Bucket::RR3, 400_000),
            (Bucket::RR4, 300_000),
            (Bucket::RR5, 300_000),
        ]);

        assert!(AllocationValidator::validate(&amounts).is_ok());
    }

    #[test]
    fn test_random_unit_multiples_summing_to_target_pass() {
        // A spread of hand-built unit-respecting allocations
        let cases = [
            [
                (Bucket::RR1, 100_000),
                (Bucket::RR2, 150_000),
                (Bucket::RR3, 300_000),
                (Bucket::RR4, 450_000),
                (Bucket::RR5, 0),
            ],
            [
                (Bucket::RR1, 0),
                (Bucket::RR2, 0),
                (Bucket::RR3, 0),
                (Bucket::RR4, 0),
                (Bucket::RR5, 0),
            ],
            [
                (Bucket::RR1, 1_000_000),
                (Bucket::RR2, 0),
                (Bucket::RR3, 0),
                (Bucket::RR4, 0),
                (Bucket::RR5, 0),
            ],
            [
                (Bucket::RR1, 50_000),
                (Bucket::RR2, 50_000),
                (Bucket::RR3, 200_000),
                (Bucket::RR4, 300_000),
                (Bucket::RR5, 300_000),
            ],
        ];

        for (i, case) in cases.into_iter().enumerate() {
            let amounts = full(case);
            let total: u64 = amounts.values().sum();
            let result = AllocationValidator::validate(&amounts);
            if total == TARGET_TOTAL {
                assert!(result.is_ok(), "case {} should pass", i);
            } else {
                assert_eq!(
                    result.unwrap_err(),
                    AllocationViolation::TotalMismatch { total }
                );
            }
        }
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(1_000), "1,000");
        assert_eq!(format_amount(1_000_000), "1,000,000");
        assert_eq!(format_amount(300_000), "300,000");
    }
}
