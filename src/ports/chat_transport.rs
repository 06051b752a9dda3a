//! Client-side transport ports.
//!
//! The connection manager drives two transports: a persistent socket
//! (`SocketConnector`) and request/response polling (`ChatApi`). Both report
//! failures as `ChatClientError`, which is also what reaches the event bus.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::chat::{ChatMessage, ClientFrame, ServerFrame};
use crate::domain::foundation::{ClientMessageId, MessageId, SessionKey, UserId};

/// Errors surfaced to chat client callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatClientError {
    /// No transport is active.
    #[error("Not connected to a chat session")]
    NotConnected,

    /// The transport failed to carry the request.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The broker refused the request.
    #[error("Rejected by broker [{code}]: {message}")]
    Rejected { code: String, message: String },

    /// A payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ChatClientError {
    pub fn transport(message: impl Into<String>) -> Self {
        ChatClientError::Transport(message.into())
    }

    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        ChatClientError::Rejected {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for ChatClientError {
    fn from(err: serde_json::Error) -> Self {
        ChatClientError::Serialization(err.to_string())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Persistent socket
// ════════════════════════════════════════════════════════════════════════════

/// Something the open socket produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketEvent {
    Frame(ServerFrame),
    /// The socket closed or failed. No further events follow.
    Closed(Option<String>),
}

/// Both directions of an open socket.
///
/// Dropping `outbound` closes the socket.
#[derive(Debug)]
pub struct SocketChannel {
    pub outbound: mpsc::UnboundedSender<ClientFrame>,
    pub inbound: mpsc::UnboundedReceiver<SocketEvent>,
}

/// Opens persistent sockets to the broker.
#[async_trait]
pub trait SocketConnector: Send + Sync {
    /// Open a socket. Resolves once the transport is up, before any join.
    async fn open(&self) -> Result<SocketChannel, ChatClientError>;
}

// ════════════════════════════════════════════════════════════════════════════
// Polling
// ════════════════════════════════════════════════════════════════════════════

/// Body of a polled message post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMessage {
    pub message: String,
    pub is_agent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_message_id: Option<ClientMessageId>,
}

/// Request/response access to a session's message resource.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Messages with id greater than `since`, in id order.
    async fn fetch_messages(
        &self,
        session_key: &SessionKey,
        since: Option<MessageId>,
    ) -> Result<Vec<ChatMessage>, ChatClientError>;

    /// Post a message; returns the broker's authoritative copy.
    async fn post_message(
        &self,
        session_key: &SessionKey,
        message: &OutgoingMessage,
    ) -> Result<ChatMessage, ChatClientError>;
}
