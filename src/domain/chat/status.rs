//! ChatSessionStatus enum for tracking the lifecycle of chat sessions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::StateMachine;

/// Lifecycle status of a chat session.
///
/// ```text
/// Active ──assign (other agent)──> Transferred ──new agent speaks──> Active
///    │                                  │
///    └──────────── end ──────> Ended <──┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChatSessionStatus {
    #[default]
    Active,
    Transferred,
    Ended,
}

impl ChatSessionStatus {
    /// Returns true if the session still accepts messages and assignments.
    pub fn is_open(&self) -> bool {
        !matches!(self, ChatSessionStatus::Ended)
    }

    /// Stable string form used by persistence adapters.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatSessionStatus::Active => "active",
            ChatSessionStatus::Transferred => "transferred",
            ChatSessionStatus::Ended => "ended",
        }
    }

    /// Parses the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ChatSessionStatus::Active),
            "transferred" => Some(ChatSessionStatus::Transferred),
            "ended" => Some(ChatSessionStatus::Ended),
            _ => None,
        }
    }
}

impl StateMachine for ChatSessionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use ChatSessionStatus::*;
        matches!(
            (self, target),
            (Active, Transferred)
                | (Active, Ended)
                | (Transferred, Transferred)
                | (Transferred, Active)
                | (Transferred, Ended)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use ChatSessionStatus::*;
        match self {
            Active => vec![Transferred, Ended],
            Transferred => vec![Transferred, Active, Ended],
            Ended => vec![],
        }
    }
}

impl fmt::Display for ChatSessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
