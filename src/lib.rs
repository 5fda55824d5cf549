//! Advisory Chat Orchestrator
//!
//! A conversation engine for three advisory scenarios (general chat,
//! investment allocation, insurance plan selection) driven by a remote
//! language-model endpoint:
//! - Administers a scored risk questionnaire
//! - Validates constrained NT$1,000,000 allocations across five risk buckets
//! - Mines free-form advisory replies for structured adjustment suggestions
//! - Reconciles two allocation rounds into a final, balanced portfolio
//!
//! CONVERSATION FLOW:
//! SETTINGS → QUESTIONNAIRE → INTRO → ALLOCATE → RECOMMEND → CHAT → FINALIZE

pub mod allocation;
pub mod api;
pub mod catalog;
pub mod completion;
pub mod content;
pub mod error;
pub mod extractor;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod questionnaire;
pub mod recommend;
pub mod score;
pub mod state;
pub mod transcript;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use orchestrator::{Orchestrator, SessionEvent, StepOutcome};
