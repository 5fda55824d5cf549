//! Error types for the advisory chat orchestrator

use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, AdvisorError>;

#[derive(Error, Debug)]
pub enum AdvisorError {

    // =============================
    // Conversation Errors
    // =============================

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Risk score {0} is outside the scored range 10-50")]
    ScoreOutOfRange(u32),

    #[error("Session not found: {0}")]
    SessionNotFound(uuid::Uuid),

    #[error("Session is busy: a model call is already in flight")]
    SessionBusy,

    #[error("Session is finalized: no further input accepted")]
    SessionFinalized,

    #[error("Model endpoint error: {0}")]
    Completion(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
