//! Transient session state exposed by the session controller.
//!
//! A session is never persisted. It records which conversation is active,
//! whether an exchange is in flight, and the last user-visible error.

use serde::{Deserialize, Serialize};

use std::fmt;

use crate::conversation::ConversationId;

/// Where the controller currently is in an exchange.
///
/// `Completed` and `Failed` are terminal per exchange and immediately
/// fold back into `Idle`, so they are reported through the exchange
/// outcome instead of this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    #[default]
    Idle,
    Dispatching,
    Streaming,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "idle"),
            SessionPhase::Dispatching => write!(f, "dispatching"),
            SessionPhase::Streaming => write!(f, "streaming"),
        }
    }
}

/// Point-in-time view of the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub active_conversation: Option<ConversationId>,
    pub loading: bool,
    pub error: Option<String>,
    pub phase: SessionPhase,
}
