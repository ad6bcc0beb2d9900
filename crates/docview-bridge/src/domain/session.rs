//! Session identity, lifecycle state, and session errors.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Identifies one mounted viewing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a fresh random session id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(SessionId)
            .map_err(|_| SessionError::InvalidSessionId(s.to_string()))
    }
}

/// Scopes a session's bus subscriptions.  Released on session close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextHandle(pub u64);

/// Identifies one bus subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// `Unopened → Open → Closed`.  `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Unopened,
    Open,
    Closed,
}

/// Errors raised by session operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// A programming error in the caller: double open, surface replaced,
    /// reopening a closed session.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// The session has been unmounted; its event queue is gone.
    #[error("session {0} is closed")]
    Closed(SessionId),

    /// No mounted session has this id.
    #[error("unknown session {0}")]
    UnknownSession(String),

    /// A session id string could not be parsed.
    #[error("invalid session id: {0}")]
    InvalidSessionId(String),
}

/// Point-in-time view of a session, for the host and for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub owner_id: String,
    pub state: LifecycleState,
    pub surface_ready: bool,
    pub has_pending_envelope: bool,
    pub has_saved: bool,
    /// Human-readable summary of the last bus notification.
    pub received_message: Option<String>,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
