//! Chat message records.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{
    ChatSessionId, ClientMessageId, MessageId, Timestamp, UserId, ValidationError,
};

/// Default upper bound on message length, in characters.
pub const DEFAULT_MAX_MESSAGE_LENGTH: usize = 2_000;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderType {
    User,
    Agent,
    System,
}

impl SenderType {
    /// Sender type for a human caller.
    pub fn from_is_agent(is_agent: bool) -> Self {
        if is_agent {
            SenderType::Agent
        } else {
            SenderType::User
        }
    }

    /// Stable string form used by persistence adapters.
    pub fn as_str(&self) -> &'static str {
        match self {
            SenderType::User => "user",
            SenderType::Agent => "agent",
            SenderType::System => "system",
        }
    }

    /// Parses the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user" => Some(SenderType::User),
            "agent" => Some(SenderType::Agent),
            "system" => Some(SenderType::System),
            _ => None,
        }
    }
}

impl fmt::Display for SenderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validated message text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBody(String);

impl MessageBody {
    /// Validates and trims the text.
    ///
    /// # Errors
    ///
    /// - `EmptyField` if nothing but whitespace remains
    /// - `TooLong` if longer than `max_len` characters
    pub fn parse(text: &str, max_len: usize) -> Result<Self, ValidationError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("message"));
        }
        let len = trimmed.chars().count();
        if len > max_len {
            return Err(ValidationError::too_long("message", max_len, len));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the body, returning the text.
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// A message the broker has accepted but not yet numbered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewChatMessage {
    pub body: MessageBody,
    pub sender_type: SenderType,
    pub sender_id: Option<UserId>,
    pub client_message_id: Option<ClientMessageId>,
}

impl NewChatMessage {
    /// A message from a visitor or agent.
    pub fn from_party(
        body: MessageBody,
        sender_type: SenderType,
        sender_id: Option<UserId>,
        client_message_id: Option<ClientMessageId>,
    ) -> Self {
        Self {
            body,
            sender_type,
            sender_id,
            client_message_id,
        }
    }

    /// A broker-authored notice. System messages never carry a sender.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            body: MessageBody(text.into()),
            sender_type: SenderType::System,
            sender_id: None,
            client_message_id: None,
        }
    }

    /// Numbers and stamps the draft.
    pub fn into_message(
        self,
        id: MessageId,
        session_id: ChatSessionId,
        created_at: Timestamp,
    ) -> ChatMessage {
        ChatMessage {
            id,
            session_id,
            body: self.body.into_inner(),
            sender_type: self.sender_type,
            sender_id: self.sender_id,
            created_at,
            is_read: false,
            client_message_id: self.client_message_id,
        }
    }
}

/// An authoritative chat message.
///
/// `id` increases strictly within a session and `created_at` never decreases
/// along it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub session_id: ChatSessionId,
    pub body: String,
    pub sender_type: SenderType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<UserId>,
    pub created_at: Timestamp,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_message_id: Option<ClientMessageId>,
}
