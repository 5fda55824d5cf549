//! Questionnaire reference data
//!
//! Per-vertical question lists, loaded once and never mutated. Answers are
//! 1-indexed option choices; the investment questionnaire's ten five-option
//! questions put the total score in the 10-50 band the tier mapping expects.

use crate::models::Vertical;

/// One question with its ordered option labels
#[derive(Debug, Clone, Copy)]
pub struct QuestionnaireItem {
    pub prompt: &'static str,
    pub options: &'static [&'static str],
}

const RISK_APPETITE_OPTIONS: [&str; 5] = [
    "Strongly disagree",
    "Disagree",
    "Neutral",
    "Agree",
    "Strongly agree",
];

const INVESTMENT_QUESTIONS: [QuestionnaireItem; 10] = [
    QuestionnaireItem {
        prompt: "I am comfortable seeing the value of my investments fall by 10% or more in a single month.",
        options: &RISK_APPETITE_OPTIONS,
    },
    QuestionnaireItem {
        prompt: "Earning a high long-term return matters more to me than avoiding short-term losses.",
        options: &RISK_APPETITE_OPTIONS,
    },
    QuestionnaireItem {
        prompt: "If a fund I hold dropped sharply, I would buy more rather than sell.",
        options: &RISK_APPETITE_OPTIONS,
    },
    QuestionnaireItem {
        prompt: "I have investment experience beyond bank deposits, such as funds, stocks, or bonds.",
        options: &RISK_APPETITE_OPTIONS,
    },
    QuestionnaireItem {
        prompt: "I could cover an unexpected major expense without touching this investment.",
        options: &RISK_APPETITE_OPTIONS,
    },
    QuestionnaireItem {
        prompt: "I do not expect to need this money within the next five years.",
        options: &RISK_APPETITE_OPTIONS,
    },
    QuestionnaireItem {
        prompt: "I would accept the possibility of losing part of my principal in exchange for higher growth.",
        options: &RISK_APPETITE_OPTIONS,
    },
    QuestionnaireItem {
        prompt: "Market news and price swings do not affect my mood or my decisions.",
        options: &RISK_APPETITE_OPTIONS,
    },
    QuestionnaireItem {
        prompt: "I prefer emerging or thematic markets over established, stable ones.",
        options: &RISK_APPETITE_OPTIONS,
    },
    QuestionnaireItem {
        prompt: "My income is stable enough that I rely on it, not on investment returns, for daily life.",
        options: &RISK_APPETITE_OPTIONS,
    },
];

const INSURANCE_QUESTIONS: [QuestionnaireItem; 3] = [
    QuestionnaireItem {
        prompt: "How concerned are you about medical emergencies and travel risks?",
        options: &["Low Concern", "Moderate Concern", "High Concern"],
    },
    QuestionnaireItem {
        prompt: "How important is it for you to save money for other expenses?",
        options: &["Very Important", "Somewhat Important", "Not Important"],
    },
    QuestionnaireItem {
        prompt: "How will you spend your time outside of studying?",
        options: &[
            "I will mostly stay on campus and focus on studying.",
            "I plan to travel frequently to different cities/countries.",
            "I will participate in outdoor or adventure activities (e.g., skiing, hiking, diving).",
            "I will work part-time and commute regularly.",
        ],
    },
];

/// The question list for a vertical. The plain chat vertical has none.
pub fn questionnaire(vertical: Vertical) -> &'static [QuestionnaireItem] {
    match vertical {
        Vertical::Investment => &INVESTMENT_QUESTIONS,
        Vertical::Insurance => &INSURANCE_QUESTIONS,
        Vertical::Chat => &[],
    }
}

/// Render question `index` (0-based) with numbered options
pub fn render_question(index: usize, item: &QuestionnaireItem) -> String {
    let mut out = format!("Question {}: {}\n", index + 1, item.prompt);
    for (i, option) in item.options.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, option));
    }
    out.push_str("Reply with the number of your choice.");
    out
}

/// Parse a user reply as a 1-indexed option choice for `item`.
/// Returns `None` for non-numeric or out-of-range input.
pub fn parse_answer(text: &str, item: &QuestionnaireItem) -> Option<u8> {
    let choice: usize = text.trim().parse().ok()?;
    if choice >= 1 && choice <= item.options.len() {
        Some(choice as u8)
    } else {
        None
    }
}
