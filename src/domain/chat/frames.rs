//! Wire frames exchanged over the persistent chat channel.
//!
//! Both the broker's socket handler and the client connection manager speak
//! this protocol, so it lives next to the types it carries.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ClientMessageId, SessionKey, UserId};

use super::{ChatError, ChatMessage, ChatSession};

// ============================================
// Client → Server Frames
// ============================================

/// Frames a client may send after the socket opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Attach this socket to a session. Must be the first frame.
    JoinSession {
        session_id: SessionKey,
        #[serde(default)]
        user_id: Option<UserId>,
        #[serde(default)]
        is_agent: bool,
    },

    /// Post a message to the joined session.
    #[serde(rename = "chat_message")]
    Chat {
        message: String,
        #[serde(default)]
        is_agent: bool,
        #[serde(default)]
        sender_id: Option<UserId>,
        #[serde(default)]
        client_message_id: Option<ClientMessageId>,
    },

    /// Typing indicator, best effort.
    Typing { is_typing: bool },
}

// ============================================
// Server → Client Frames
// ============================================

/// Frames the broker pushes to attached sockets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Join acknowledgement carrying the session and its backlog.
    SessionJoined {
        session: ChatSession,
        messages: Vec<ChatMessage>,
        persistent: bool,
    },

    /// A message was posted to the session.
    NewMessage { message: ChatMessage },

    /// Another party started or stopped typing.
    TypingStatus {
        #[serde(default)]
        user_id: Option<UserId>,
        is_agent: bool,
        is_typing: bool,
    },

    /// Another party attached to the session.
    UserJoined {
        #[serde(default)]
        user_id: Option<UserId>,
        is_agent: bool,
    },

    /// Another party detached from the session.
    UserLeft {
        #[serde(default)]
        user_id: Option<UserId>,
        is_agent: bool,
    },

    /// The broker rejected a frame.
    Error { code: String, message: String },
}

impl ServerFrame {
    /// Error frame for a rejected operation.
    pub fn error(err: &ChatError) -> Self {
        ServerFrame::Error {
            code: err.code().as_str().to_string(),
            message: err.message(),
        }
    }

    /// Wire name of the frame type, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerFrame::SessionJoined { .. } => "session_joined",
            ServerFrame::NewMessage { .. } => "new_message",
            ServerFrame::TypingStatus { .. } => "typing_status",
            ServerFrame::UserJoined { .. } => "user_joined",
            ServerFrame::UserLeft { .. } => "user_left",
            ServerFrame::Error { .. } => "error",
        }
    }
}
