//! Conversation transcript
//!
//! Append-only message log with timestamps. Messages are never reordered
//! or dropped once accepted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Bot,
}

/// A single message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message_id: Uuid,
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(speaker: Speaker, text: impl Into<String>) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            speaker,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Shorthand for a user-authored message
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Speaker::User, text)
    }

    /// Shorthand for a bot-authored message
    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(Speaker::Bot, text)
    }
}

/// Append-only log of a session's messages, in strict arrival order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageLog {
    messages: Vec<ChatMessage>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Append a message. This is the only mutation the log supports.
    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Iterate over all messages in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    /// The N most recent messages, oldest first
    pub fn recent(&self, count: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(count);
        &self.messages[start..]
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
