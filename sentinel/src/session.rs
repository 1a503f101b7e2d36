//! Per-user session state.
//!
//! Sessions and behavior records have separate lifecycles: resetting a
//! session clears the block but never touches history.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::crisis::CrisisResourceBundle;
use crate::types::Action;

/// Escalation state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationState {
    /// No outstanding warnings
    Normal,
    /// Warned once for inappropriate content
    Warned,
    /// Blocked until reset
    Blocked,
    /// Blocked on a crisis; resources shown until reset
    CrisisBlocked,
}

impl ModerationState {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationState::Normal => "normal",
            ModerationState::Warned => "warned",
            ModerationState::Blocked => "blocked",
            ModerationState::CrisisBlocked => "crisis_blocked",
        }
    }
}

/// Why a session was blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockCause {
    None,
    InappropriateRepeat,
    Violence,
    Extremist,
    Crisis,
}

impl BlockCause {
    /// Action reported while blocked for this cause.
    pub fn action(&self) -> Action {
        match self {
            BlockCause::None => Action::Allow,
            BlockCause::InappropriateRepeat | BlockCause::Crisis => Action::Suspend,
            BlockCause::Violence | BlockCause::Extremist => Action::Ban,
        }
    }
}

/// Session state for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// User ID
    pub user_id: String,
    /// Escalation state
    pub state: ModerationState,
    /// Whether the session is blocked
    pub blocked: bool,
    /// Why it is blocked
    pub block_cause: BlockCause,
    /// Resources shown for a crisis block
    pub crisis_bundle: Option<CrisisResourceBundle>,
    /// When the block was applied
    pub blocked_at: Option<DateTime<Utc>>,
}

impl SessionState {
    /// A fresh session.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            state: ModerationState::Normal,
            blocked: false,
            block_cause: BlockCause::None,
            crisis_bundle: None,
            blocked_at: None,
        }
    }

    /// Whether the session is blocked.
    pub fn is_blocked(&self) -> bool {
        self.blocked
    }

    /// Mark as warned. No-op once blocked.
    pub fn warn(&mut self) {
        if !self.blocked {
            self.state = ModerationState::Warned;
        }
    }

    /// Block for a non-crisis cause.
    pub fn block(&mut self, cause: BlockCause) {
        self.state = ModerationState::Blocked;
        self.blocked = true;
        self.block_cause = cause;
        self.blocked_at = Some(Utc::now());
    }

    /// Block for a crisis, keeping the bundle for display.
    pub fn enter_crisis(&mut self, bundle: CrisisResourceBundle) {
        self.state = ModerationState::CrisisBlocked;
        self.blocked = true;
        self.block_cause = BlockCause::Crisis;
        self.crisis_bundle = Some(bundle);
        self.blocked_at = Some(Utc::now());
    }

    /// Return to `Normal`, clearing block, cause and bundle.
    pub fn clear(&mut self) {
        self.state = ModerationState::Normal;
        self.blocked = false;
        self.block_cause = BlockCause::None;
        self.crisis_bundle = None;
        self.blocked_at = None;
    }
}

/// Session registry keyed by user ID.
///
/// Each entry's mutex is the user's lane: holding it serialises every state
/// transition for that user.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Mutex<SessionState>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Get or create the lane for a user.
    pub fn lane(&self, user_id: &str) -> Arc<Mutex<SessionState>> {
        self.sessions
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(SessionState::new(user_id))))
            .value()
            .clone()
    }

    /// Copy of a user's session; a fresh one for unknown users.
    pub async fn snapshot(&self, user_id: &str) -> SessionState {
        let existing = self.sessions.get(user_id).map(|s| s.value().clone());
        match existing {
            Some(session) => session.lock().await.clone(),
            None => SessionState::new(user_id),
        }
    }

    /// Number of known sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is known.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_and_clear() {
        let mut session = SessionState::new("u1");
        session.warn();
        assert_eq!(session.state, ModerationState::Warned);

        session.block(BlockCause::Violence);
        assert!(session.is_blocked());
        assert_eq!(session.block_cause.action(), Action::Ban);

        session.warn();
        assert_eq!(session.state, ModerationState::Blocked);

        session.clear();
        assert_eq!(session.state, ModerationState::Normal);
        assert!(!session.blocked);
        assert_eq!(session.block_cause, BlockCause::None);
    }

    #[test]
    fn test_crisis_keeps_bundle() {
        let mut session = SessionState::new("u1");
        session.enter_crisis(CrisisResourceBundle::new());
        assert_eq!(session.state, ModerationState::CrisisBlocked);
        assert_eq!(session.block_cause.action(), Action::Suspend);
        assert!(session.crisis_bundle.is_some());

        session.clear();
        assert!(session.crisis_bundle.is_none());
    }

    #[tokio::test]
    async fn test_registry_lanes_are_shared() {
        let registry = SessionRegistry::new();
        {
            let lane = registry.lane("u1");
            lane.lock().await.block(BlockCause::Extremist);
        }
        assert!(registry.snapshot("u1").await.is_blocked());
        assert!(!registry.snapshot("u2").await.is_blocked());
        assert_eq!(registry.len(), 1);
    }
}
