//! Session storage
//!
//! Holds the live sessions and serializes access to each one: a session is
//! claimed before an orchestration step and released after, so only one
//! model call can be in flight per session. In-memory only; sessions live
//! for the browser session and die with the process.

use crate::error::AdvisorError;
use crate::models::Session;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Trait for session persistence
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert or replace a session (settings resubmission replaces wholesale)
    async fn put(&self, session: Session) -> Result<()>;

    /// Read-only snapshot of a session
    async fn get(&self, session_id: Uuid) -> Result<Option<Session>>;

    /// Claim a session for one orchestration step. Marks it busy; a second
    /// claim before release fails with `SessionBusy`.
    async fn claim(&self, session_id: Uuid) -> Result<Session>;

    /// Store the stepped session and clear its busy flag
    async fn release(&self, session: Session) -> Result<()>;
}

/// In-memory session store
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn put(&self, session: Session) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.session_id, session);
        Ok(())
    }

    async fn get(&self, session_id: Uuid) -> Result<Option<Session>> {
        let sessions = self.sessions.read().await;
        Ok(sessions.get(&session_id).cloned())
    }

    async fn claim(&self, session_id: Uuid) -> Result<Session> {
        let mut sessions = self.sessions.write().await;

        let session = sessions
            .get_mut(&session_id)
            .ok_or(AdvisorError::SessionNotFound(session_id))?;

        if session.busy {
            return Err(AdvisorError::SessionBusy);
        }

        session.busy = true;
        Ok(session.clone())
    }

    async fn release(&self, mut session: Session) -> Result<()> {
        session.busy = false;
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.session_id, session);
        Ok(())
    }
}
