//! Request and response bodies for the chat REST API.

use serde::{Deserialize, Serialize};

use crate::domain::chat::{AgentAssignment, ChatMessage, ChatSession};
use crate::domain::foundation::{ClientMessageId, MessageId, UserId};

// ════════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════════

/// Body of `POST /sessions/:key/messages`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PostMessageRequest {
    pub message: String,
    #[serde(default)]
    pub is_agent: bool,
    #[serde(default)]
    pub sender_id: Option<UserId>,
    #[serde(default)]
    pub client_message_id: Option<ClientMessageId>,
}

/// Body of `POST /sessions/:key/assign`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AssignAgentRequest {
    pub agent_id: UserId,
}

/// Body of `POST /sessions/:key/read`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MarkReadRequest {
    #[serde(default)]
    pub as_agent: bool,
    #[serde(default)]
    pub up_to_id: Option<MessageId>,
}

/// Query of `GET /sessions/:key/messages`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagesParams {
    #[serde(default)]
    pub since_id: Option<MessageId>,
}

/// Query of `GET /sessions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionsParams {
    #[serde(default)]
    pub include_ended: bool,
}

/// Query of `GET /sessions/:key/unread`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UnreadParams {
    #[serde(default)]
    pub as_agent: bool,
}

// ════════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════════

/// Response of an agent assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignAgentResponse {
    pub session: ChatSession,
    /// "unchanged", "assigned" or "transferred".
    pub assignment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_agent_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<ChatMessage>,
}

impl AssignAgentResponse {
    pub fn new(session: ChatSession, assignment: AgentAssignment, notice: Option<ChatMessage>) -> Self {
        let (label, previous_agent_id) = match assignment {
            AgentAssignment::Unchanged => ("unchanged", None),
            AgentAssignment::Assigned => ("assigned", None),
            AgentAssignment::Transferred { previous } => ("transferred", Some(previous)),
        };
        Self {
            session,
            assignment: label.to_string(),
            previous_agent_id,
            notice,
        }
    }
}

/// Response of `POST /sessions/:key/read`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkReadResponse {
    pub marked: u64,
}

/// Response of `GET /sessions/:key/unread`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadResponse {
    pub unread: u64,
}

/// Standard error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
