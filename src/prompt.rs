//! Prompt composition
//!
//! Builds the message list sent to the model endpoint: one system turn for
//! the current scenario, then the conversation history. The downstream API
//! requires strictly alternating speaker roles, so a synthetic
//! "please continue" user turn is inserted between any two consecutive
//! assistant turns.

use crate::content;
use crate::models::{Session, Vertical};
use crate::transcript::Speaker;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: String,
}

impl PromptMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

pub struct PromptComposer;

impl PromptComposer {
    /// Compose the full message list for the session's current stage.
    /// Pure function of the session; no side effects.
    pub fn compose(session: &Session) -> Vec<PromptMessage> {
        let mut messages = vec![PromptMessage::system(Self::system_prompt(session))];

        for entry in session.log.iter() {
            let message = match entry.speaker {
                Speaker::User => PromptMessage::user(entry.text.clone()),
                Speaker::Bot => PromptMessage::assistant(entry.text.clone()),
            };
            messages.push(message);
        }

        Self::enforce_alternation(messages)
    }

    fn system_prompt(session: &Session) -> String {
        match session.vertical {
            Vertical::Chat => content::chat_system_prompt().to_string(),
            Vertical::Investment => match (&session.allocation, session.risk_score) {
                (Some(allocation), Some(score)) => {
                    content::advisory_system_prompt(session.persona, score, allocation)
                }
                // Before the first allocation there is nothing to advise on
                _ => content::chat_system_prompt().to_string(),
            },
            Vertical::Insurance => content::insurance_system_prompt(
                session.persona,
                &session.questionnaire_answers,
                session.chosen_plan.as_deref(),
            ),
        }
    }

    /// Insert a synthetic user turn between consecutive assistant turns
    fn enforce_alternation(messages: Vec<PromptMessage>) -> Vec<PromptMessage> {
        let mut out: Vec<PromptMessage> = Vec::with_capacity(messages.len());

        for message in messages {
            if let Some(previous) = out.last() {
                if previous.role == Role::Assistant && message.role == Role::Assistant {
                    out.push(PromptMessage::user(content::PLEASE_CONTINUE));
                }
            }
            out.push(message);
        }

        out
    }
}
