//! Events the chat client publishes to UI consumers.
//!
//! Both transports produce the same shapes, so a consumer subscribed once
//! keeps receiving events across a socket → polling fallback.

use std::fmt;

use crate::domain::chat::{ChatMessage, ChatSession};
use crate::domain::foundation::UserId;
use crate::ports::ChatClientError;

/// Name of an event, used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatEventKind {
    Open,
    NewMessage,
    MessagesLoaded,
    Typing,
    UserJoined,
    UserLeft,
    Error,
    Close,
}

impl ChatEventKind {
    pub const ALL: [ChatEventKind; 8] = [
        ChatEventKind::Open,
        ChatEventKind::NewMessage,
        ChatEventKind::MessagesLoaded,
        ChatEventKind::Typing,
        ChatEventKind::UserJoined,
        ChatEventKind::UserLeft,
        ChatEventKind::Error,
        ChatEventKind::Close,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChatEventKind::Open => "open",
            ChatEventKind::NewMessage => "newMessage",
            ChatEventKind::MessagesLoaded => "messagesLoaded",
            ChatEventKind::Typing => "typing",
            ChatEventKind::UserJoined => "userJoined",
            ChatEventKind::UserLeft => "userLeft",
            ChatEventKind::Error => "error",
            ChatEventKind::Close => "close",
        }
    }
}

impl fmt::Display for ChatEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An event delivered through the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// A transport became usable.
    ///
    /// Over the socket this carries the joined session and its backlog. In
    /// fallback mode `session` is `None` and the backlog follows as
    /// `MessagesLoaded` from the first poll.
    Open {
        session: Option<ChatSession>,
        messages: Vec<ChatMessage>,
        fallback: bool,
    },

    /// One message arrived.
    NewMessage(ChatMessage),

    /// The first poll of a fallback activation.
    MessagesLoaded(Vec<ChatMessage>),

    Typing {
        user_id: Option<UserId>,
        is_agent: bool,
        is_typing: bool,
    },

    UserJoined {
        user_id: Option<UserId>,
        is_agent: bool,
    },

    UserLeft {
        user_id: Option<UserId>,
        is_agent: bool,
    },

    Error(ChatClientError),

    /// The persistent socket was lost after a successful join.
    Close { reason: Option<String> },
}

impl ChatEvent {
    pub fn kind(&self) -> ChatEventKind {
        match self {
            ChatEvent::Open { .. } => ChatEventKind::Open,
            ChatEvent::NewMessage(_) => ChatEventKind::NewMessage,
            ChatEvent::MessagesLoaded(_) => ChatEventKind::MessagesLoaded,
            ChatEvent::Typing { .. } => ChatEventKind::Typing,
            ChatEvent::UserJoined { .. } => ChatEventKind::UserJoined,
            ChatEvent::UserLeft { .. } => ChatEventKind::UserLeft,
            ChatEvent::Error(_) => ChatEventKind::Error,
            ChatEvent::Close { .. } => ChatEventKind::Close,
        }
    }
}
