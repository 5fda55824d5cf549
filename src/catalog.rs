//! Product reference data
//!
//! The five risk-rated buckets (RR1-RR5), the persona-specific fund tables
//! behind them, and the insurance plan sets. Immutable catalog data; no
//! session owns any of it.

use crate::models::Persona;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Target total every allocation must sum to, in NT$
pub const TARGET_TOTAL: u64 = 1_000_000;

/// Smallest unit size in the catalog; amounts below this are noise
pub const MIN_UNIT: u64 = 10_000;

//
// ================= Buckets =================
//

/// One of the five fixed risk-rated investment categories
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum Bucket {
    RR1,
    RR2,
    RR3,
    RR4,
    RR5,
}

impl Bucket {
    pub const ALL: [Bucket; 5] = [
        Bucket::RR1,
        Bucket::RR2,
        Bucket::RR3,
        Bucket::RR4,
        Bucket::RR5,
    ];

    /// Minimum nonzero investment and required multiple, in NT$
    pub fn unit_size(self) -> u64 {
        match self {
            Bucket::RR1 => 10_000,
            Bucket::RR2 => 50_000,
            Bucket::RR3 => 100_000,
            Bucket::RR4 => 150_000,
            Bucket::RR5 => 300_000,
        }
    }

    /// Coarse risk class of the bucket itself
    pub fn risk_class(self) -> &'static str {
        match self {
            Bucket::RR1 => "Ultra-conservative",
            Bucket::RR2 => "Low-risk",
            Bucket::RR3 => "Moderate-risk",
            Bucket::RR4 => "High-risk",
            Bucket::RR5 => "Very high-risk",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Bucket::RR1 => "RR1",
            Bucket::RR2 => "RR2",
            Bucket::RR3 => "RR3",
            Bucket::RR4 => "RR4",
            Bucket::RR5 => "RR5",
        }
    }

    /// Parse an "RR1".."RR5" label, case-insensitively
    pub fn from_label(label: &str) -> Option<Bucket> {
        match label.trim().to_ascii_uppercase().as_str() {
            "RR1" => Some(Bucket::RR1),
            "RR2" => Some(Bucket::RR2),
            "RR3" => Some(Bucket::RR3),
            "RR4" => Some(Bucket::RR4),
            "RR5" => Some(Bucket::RR5),
            _ => None,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

//
// ================= Fund Tables =================
//

/// A fund product backing one bucket in one persona's table
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FundProduct {
    pub bucket: Bucket,
    pub name: &'static str,
    pub annual_return: &'static str,
    pub volatility: &'static str,
    pub kind: &'static str,
    pub description: &'static str,
}

const INTROVERTED_FUNDS: [FundProduct; 5] = [
    FundProduct {
        bucket: Bucket::RR1,
        name: "Franklin Templeton Sinoam Money Market Fund",
        annual_return: "3.12%",
        volatility: "Very Low",
        kind: "Money Market Fund",
        description: "Highly liquid, very low-risk short-term money instruments. Suitable for conservative investors.",
    },
    FundProduct {
        bucket: Bucket::RR2,
        name: "BlackRock Global Funds - Global Government Bond Fund A2",
        annual_return: "6.17%",
        volatility: "Low",
        kind: "Bond Fund",
        description: "Invests in investment-grade government bonds. Offers stable interest payments with low risk.",
    },
    FundProduct {
        bucket: Bucket::RR3,
        name: "Schroder International Selection Fund Global Multi-Asset Balanced",
        annual_return: "10.53%",
        volatility: "Medium",
        kind: "Balanced Fund",
        description: "Focuses on mature markets with a mix of stocks and bonds, emphasizing stable cash flow and low volatility.",
    },
    FundProduct {
        bucket: Bucket::RR4,
        name: "JPMorgan Funds - Europe Equity Fund A (acc) - USD",
        annual_return: "21.38%",
        volatility: "High",
        kind: "Equity Fund",
        description: "Invests in high-dividend large-cap European companies with relatively lower volatility.",
    },
    FundProduct {
        bucket: Bucket::RR5,
        name: "Invesco Global Equity Income Fund A USD",
        annual_return: "26.46%",
        volatility: "Very High",
        kind: "Equity Fund",
        description: "Targets globally leading high-quality companies for steady growth and long-term capital gains.",
    },
];

const EXTROVERTED_FUNDS: [FundProduct; 5] = [
    FundProduct {
        bucket: Bucket::RR1,
        name: "Eastspring Investments Well Pool Money Market Fund",
        annual_return: "3.12%",
        volatility: "Very Low",
        kind: "Money Market Fund",
        description: "Focused on short-term money market instruments. Extremely low volatility. A parking spot for idle funds.",
    },
    FundProduct {
        bucket: Bucket::RR2,
        name: "Schroder International Selection Fund Global High Yield A1",
        annual_return: "6.01%",
        volatility: "Low",
        kind: "Bond Fund",
        description: "Invests in global high-yield bonds, aiming for stable interest income with controlled risk.",
    },
    FundProduct {
        bucket: Bucket::RR3,
        name: "PineBridge Preferred Securities Income Fund USD N",
        annual_return: "10.49%",
        volatility: "Medium",
        kind: "Balanced Fund",
        description: "Flexible allocation between stocks and bonds. For investors seeking income with steady growth.",
    },
    FundProduct {
        bucket: Bucket::RR4,
        name: "FSITC China Century Fund-TWD",
        annual_return: "21.42%",
        volatility: "High",
        kind: "Emerging Markets Equity Fund",
        description: "Focuses on China's domestic demand and growth enterprises. High potential with significant volatility.",
    },
    FundProduct {
        bucket: Bucket::RR5,
        name: "Franklin Innovation Fund Class A (acc) USD",
        annual_return: "26.46%",
        volatility: "Very High",
        kind: "Thematic Fund",
        description: "Invests in innovative technology sectors such as AI, biotech, and net-zero transition. Seeks rapid capital growth.",
    },
];

/// The five-fund table shown to a persona, RR1 through RR5
pub fn fund_table(persona: Persona) -> &'static [FundProduct; 5] {
    match persona {
        Persona::Introverted => &INTROVERTED_FUNDS,
        Persona::Extroverted => &EXTROVERTED_FUNDS,
    }
}

//
// ================= Insurance Plans =================
//

/// An insurance plan option with its headline coverage rows
#[derive(Debug, Clone, Copy, Serialize)]
pub struct InsurancePlan {
    pub name: &'static str,
    pub monthly_premium: &'static str,
    pub accidental_cover: &'static str,
    pub hospitalization_limit: &'static str,
    pub emergency_assistance: &'static str,
}

const INTROVERTED_PLANS: [InsurancePlan; 3] = [
    InsurancePlan {
        name: "New Protection Plan",
        monthly_premium: "NT$5,500/month",
        accidental_cover: "NT$3 million",
        hospitalization_limit: "NT$100,000",
        emergency_assistance: "NT$1 million",
    },
    InsurancePlan {
        name: "Secure Choice Plan",
        monthly_premium: "NT$10,000/month",
        accidental_cover: "NT$4 million",
        hospitalization_limit: "NT$100,000",
        emergency_assistance: "NT$1 million",
    },
    InsurancePlan {
        name: "Comprehensive Shield Plan",
        monthly_premium: "NT$15,000/month",
        accidental_cover: "NT$5 million",
        hospitalization_limit: "NT$200,000",
        emergency_assistance: "NT$1.5 million",
    },
];

const EXTROVERTED_PLANS: [InsurancePlan; 3] = [
    InsurancePlan {
        name: "Lite Plan",
        monthly_premium: "NT$5,500/month",
        accidental_cover: "NT$3 million",
        hospitalization_limit: "NT$100,000",
        emergency_assistance: "NT$1 million",
    },
    InsurancePlan {
        name: "Basic Plan",
        monthly_premium: "NT$10,000/month",
        accidental_cover: "NT$5.45 million",
        hospitalization_limit: "NT$180,000",
        emergency_assistance: "NT$1.81 million",
    },
    InsurancePlan {
        name: "Advanced Plan",
        monthly_premium: "NT$15,000/month",
        accidental_cover: "NT$8.18 million",
        hospitalization_limit: "NT$270,000",
        emergency_assistance: "NT$2.72 million",
    },
];

/// The plan set shown to a persona; label sets are persona-distinct
pub fn plan_table(persona: Persona) -> &'static [InsurancePlan; 3] {
    match persona {
        Persona::Introverted => &INTROVERTED_PLANS,
        Persona::Extroverted => &EXTROVERTED_PLANS,
    }
}

/// Whether `name` is a valid plan label for the persona
pub fn is_known_plan(persona: Persona, name: &str) -> bool {
    plan_table(persona)
        .iter()
        .any(|plan| plan.name.eq_ignore_ascii_case(name.trim()))
}
