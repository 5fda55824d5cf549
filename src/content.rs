//! Conversation content
//!
//! Stage briefing texts and system-prompt builders. Everything here is a
//! pure function from session facts to strings; the orchestrator decides
//! when each piece is spoken.

use crate::allocation::{format_amount, Allocation};
use crate::catalog::{self, Bucket};
use crate::models::{Persona, Vertical};

/// Fixed apology appended when the model endpoint fails; the stage never
/// advances on that turn, so the user can simply retry.
pub const TRANSPORT_APOLOGY: &str =
    "Sorry, something went wrong while contacting the advisor. Please try again in a moment.";

/// Synthetic user turn inserted between two consecutive bot turns so the
/// downstream API sees strictly alternating roles.
pub const PLEASE_CONTINUE: &str = "please continue";

/// Clarifying clause appended to forwarded user turns that mention
/// "exact", biasing the model toward unit-sized transfer statements.
pub const EXACT_CLAUSE: &str =
    " Please state exact amounts in the form \"Move NT$X from RRa to RRb\", respecting each fund's unit size.";

/// Risk-category walkthrough spoken before the first allocation
pub const RISK_CATEGORY_INTRO: &str = "\
Hi! As an investment advisor, I would like to introduce you to the five investment product risk categories. These categories help us understand the level of risk involved in each investment option.

🟢 RR1: Ultra-conservative - Money market and time deposits: designed for individuals who prioritize preserving their capital and earning a low but stable return.

🟢 RR2: Low-risk - Bond funds with stable returns: a moderate level of risk with a predictable income stream. Suitable for steady returns with minimal volatility.

🟡 RR3: Moderate-risk - Balanced or bond-heavy funds: a balance between stability and growth, combining bonds with a mix of stocks.

🔴 RR4: High-risk - Growth funds (regional or thematic): higher risk with the potential for higher returns, focused on specific regions, sectors, or themes.

🚨 RR5: Very high-risk - Emerging market or sector-focused: high-growth potential for individuals comfortable with significant swings in value.";

/// Greeting for a fresh session
pub fn greeting(vertical: Vertical, persona: Persona) -> String {
    match (vertical, persona) {
        (Vertical::Chat, _) => {
            "Hi! I'm your assistant. Ask me anything to get started.".to_string()
        }
        (Vertical::Investment, Persona::Introverted) => {
            "Hello, and welcome. I'm here to help you think through your investment decisions at your own pace. \
             We'll start with a short questionnaire to understand your risk profile."
                .to_string()
        }
        (Vertical::Investment, Persona::Extroverted) => {
            "Hey there! Great to meet you — let's build you an exciting portfolio! \
             First up: a quick questionnaire so I can get a feel for your risk appetite."
                .to_string()
        }
        (Vertical::Insurance, Persona::Introverted) => {
            "Hello. I'll help you find an insurance plan that quietly covers what matters. \
             Please pick a plan that looks reasonable to you; we'll then go through a few questions together."
                .to_string()
        }
        (Vertical::Insurance, Persona::Extroverted) => {
            "Hi! Ready to get you covered for your adventures? \
             Pick whichever plan catches your eye and then I'll ask a few quick questions!"
                .to_string()
        }
    }
}

/// The NT$1,000,000 allocation briefing, rendered from the persona's fund
/// table so the product data has a single source.
pub fn allocation_briefing(persona: Persona) -> String {
    let mut out = String::new();

    match persona {
        Persona::Introverted => out.push_str(
            "Imagine this: you're about to graduate and are thinking ahead — building savings, a new city, maybe studying abroad. \
             You want your finances to be stable and secure enough to support your plans over the next few years.\n\n\
             You currently have NT$1,000,000 available to invest. Investing is all about balance: some funds offer higher potential \
             returns with greater risk to your principal, others are more stable with lower but steadier returns.\n\n\
             Your task: carefully divide this NT$1,000,000 across one or more of the following funds, based on your risk \
             preference and financial goals.\n🎯 Each fund has a minimum investment unit. Your allocation must follow these rules.\n\n",
        ),
        Persona::Extroverted => out.push_str(
            "Imagine this: you're about to step out of campus and start a brand new chapter — maybe the workforce, your own \
             business, or a new city. You have NT$1,000,000 in investable capital, and now is the perfect time to build momentum!\n\n\
             Each option carries its own mix of opportunity and risk. Aggressive choices may grow fast with more volatility; \
             conservative ones keep things steady.\n\n\
             Your challenge: allocate the NT$1,000,000 across the options below in a way that reflects your style and ambition.\n\
             🎯 Each fund has a minimum investment unit, so make sure your allocation follows the rules.\n\n",
        ),
    }

    out.push_str("Here are your options:\n\n");
    for product in catalog::fund_table(persona) {
        out.push_str(&format!(
            "**{} ({})**\nReturn: {} per year\nVolatility: {}\nMinimum Investment: NT${}\nType: {}\nFeature: {}\n\n",
            product.name,
            product.bucket,
            product.annual_return,
            product.volatility,
            format_amount(product.bucket.unit_size()),
            product.kind,
            product.description,
        ));
    }

    out.push_str(
        "📌 Enter your allocation in the allocation form. The total must equal exactly NT$1,000,000, \
         and every amount must be 0 or a multiple of the fund's unit size.\n\n\
         Once you're ready, submit your allocation and I'll help evaluate how well it fits your risk profile.",
    );

    out
}

/// Advisory system prompt for the recommendation turn and the free chat
/// that follows it. Keyed on persona, score, and current allocation.
pub fn advisory_system_prompt(persona: Persona, score: u32, allocation: &Allocation) -> String {
    let stance = match persona {
        Persona::Introverted => "You are a careful, measured financial advisor helping adjust",
        Persona::Extroverted => "You are an energetic, upbeat financial advisor reviewing",
    };

    let tier_guidance = match persona {
        Persona::Introverted => "\
- Low Risk (10-15): Favor RR1, RR2
- Medium Risk (16-30): Favor RR2, RR3, RR4
- High Risk (31-50): Favor RR3, RR4, RR5",
        Persona::Extroverted => "\
- Low Risk (10-15): Increase RR3 to enhance portfolio returns
- Medium Risk (16-30): Increase RR3, RR4, RR5 for a more aggressive allocation
- High Risk (31-50): Focus on RR4 and RR5 for maximum returns",
    };

    format!(
        "{stance} a NT$1,000,000 investment portfolio across five funds (RR1-RR5). The user's current allocation is:

{allocation}

User's risk score: {score} (10-15: Low Risk, 16-30: Medium Risk, 31-50: High Risk)

IMPORTANT RULES:
1. For EVERY increase, there MUST be a corresponding decrease elsewhere
2. STRICT INVESTMENT UNIT SIZES - You MUST follow these precise increments:
{units}

Risk score recommendations:
{tier_guidance}

FORMAT YOUR RESPONSE:
1. Brief analysis of the current allocation vs the risk profile (1-2 sentences)
2. For each necessary change, recommend moving a specific amount from one fund to another:
   - \"⬆️ Move NT$300,000 from RR1 to RR5\"
   - \"⬆️ Transfer NT$450,000 from RR2 to RR4\"
   - \"✅ Keep RR3 unchanged at current level\"
3. One-sentence explanation for each recommendation

CRITICAL:
- Frame each change as moving money directly from one fund to another so the total always remains exactly NT$1,000,000.
- ALWAYS verify that your recommended amounts follow the required unit sizes for each fund.",
        stance = stance,
        allocation = allocation.describe(),
        score = score,
        units = unit_size_rules(),
        tier_guidance = tier_guidance,
    )
}

fn unit_size_rules() -> String {
    Bucket::ALL
        .iter()
        .map(|bucket| {
            let unit = bucket.unit_size();
            format!(
                "   * {}: Must be in multiples of NT${} (e.g., NT${}, NT${})",
                bucket,
                format_amount(unit),
                format_amount(unit),
                format_amount(unit * 2),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// System prompt for the plain chat vertical
pub fn chat_system_prompt() -> &'static str {
    "You are a helpful assistant that provides concise and accurate answers."
}

/// System prompt for the insurance advisory turns
pub fn insurance_system_prompt(
    persona: Persona,
    answers: &[u8],
    chosen_plan: Option<&str>,
) -> String {
    let stance = match persona {
        Persona::Introverted => {
            "You are a calm, reassuring insurance advisor for a student going abroad."
        }
        Persona::Extroverted => {
            "You are an enthusiastic insurance advisor for a student going abroad."
        }
    };

    let mut prompt = format!(
        "{}\n\nAvailable plans:\n{}\n",
        stance,
        plan_overview(persona)
    );

    if let Some(plan) = chosen_plan {
        prompt.push_str(&format!("\nThe user currently has the \"{}\" selected.\n", plan));
    }
    if !answers.is_empty() {
        let rendered: Vec<String> = answers.iter().map(|a| a.to_string()).collect();
        prompt.push_str(&format!(
            "\nQuestionnaire option choices, in order: {}.\n",
            rendered.join(", ")
        ));
    }

    prompt.push_str(
        "\nDiscuss whether the selected plan fits the user's answers, compare it with the \
         alternatives where relevant, and answer follow-up questions concisely.",
    );
    prompt
}

/// Plan-choice briefing spoken when the insurance conversation opens
pub fn plan_choice_briefing(persona: Persona) -> String {
    format!(
        "Here are the insurance plans available to you:\n\n{}\nPlease choose a plan from the plan selector to continue.",
        plan_overview(persona)
    )
}

fn plan_overview(persona: Persona) -> String {
    let mut out = String::new();
    for plan in catalog::plan_table(persona) {
        out.push_str(&format!(
            "- {}: {} | Accidental Death & Disability {} | Emergency Hospitalization limit {} | Emergency Assistance {}\n",
            plan.name,
            plan.monthly_premium,
            plan.accidental_cover,
            plan.hospitalization_limit,
            plan.emergency_assistance,
        ));
    }
    out
}

/// Invitation to the final allocation round, with the pre-seeded amounts
pub fn final_allocation_invite(seeded: &std::collections::BTreeMap<Bucket, u64>) -> String {
    let mut out = String::from(
        "Understood — let's lock in your final portfolio. The allocation form is pre-filled with your \
         first allocation adjusted by the recommendations:\n\n",
    );
    for (bucket, amount) in seeded {
        out.push_str(&format!("- {}: NT${}\n", bucket, format_amount(*amount)));
    }
    out.push_str(
        "\nAdjust as you see fit, then save. The total must still equal NT$1,000,000 and respect each fund's unit size.",
    );
    out
}
