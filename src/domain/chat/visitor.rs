//! Visitor identity and viewer perspective.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::UserId;

use super::SenderType;

/// The party that opened a chat session.
///
/// Fixed at creation: either a signed-in storefront user or an anonymous
/// identity derived from the client address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Visitor {
    User { user_id: UserId },
    Anonymous { anonymous_id: String },
}

impl Visitor {
    /// Visitor for a known user.
    pub fn user(user_id: UserId) -> Self {
        Visitor::User { user_id }
    }

    /// Visitor identified only by client address.
    pub fn anonymous(anonymous_id: impl Into<String>) -> Self {
        Visitor::Anonymous {
            anonymous_id: anonymous_id.into(),
        }
    }

    /// Picks the user identity when present, otherwise the anonymous one.
    pub fn from_caller(caller: Option<UserId>, client_addr: &str) -> Self {
        match caller {
            Some(user_id) => Visitor::user(user_id),
            None => Visitor::anonymous(format!("ip:{}", client_addr)),
        }
    }

    /// Returns the user id for a known visitor.
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Visitor::User { user_id } => Some(*user_id),
            Visitor::Anonymous { .. } => None,
        }
    }

    /// Returns true if this visitor carries no user identity.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Visitor::Anonymous { .. })
    }
}

impl fmt::Display for Visitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visitor::User { user_id } => write!(f, "user:{}", user_id),
            Visitor::Anonymous { anonymous_id } => write!(f, "{}", anonymous_id),
        }
    }
}

/// Side of the conversation a read acknowledgement or unread count is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Viewer {
    Visitor,
    Agent,
}

impl Viewer {
    /// Viewer for a caller acting as agent or not.
    pub fn from_is_agent(is_agent: bool) -> Self {
        if is_agent {
            Viewer::Agent
        } else {
            Viewer::Visitor
        }
    }

    /// Sender types whose messages this viewer receives.
    ///
    /// A viewer never has unread messages of its own.
    pub fn incoming_sender_types(&self) -> &'static [SenderType] {
        match self {
            Viewer::Visitor => &[SenderType::Agent, SenderType::System],
            Viewer::Agent => &[SenderType::User],
        }
    }

    /// Returns true if a message from `sender` is addressed to this viewer.
    pub fn receives(&self, sender: SenderType) -> bool {
        self.incoming_sender_types().contains(&sender)
    }
}
