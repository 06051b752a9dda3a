//! Chat command and query handlers.
//!
//! Writes to a session (`post_message`, `assign_agent`, `end_session`) run
//! under that session's lock from `SessionLocks`; reads go straight to the
//! repository.

mod access;
mod append;
mod assign_agent;
mod broker;
mod create_or_join_session;
mod end_session;
mod get_session;
mod list_messages;
mod list_sessions;
mod mark_read;
mod post_message;
mod session_locks;
mod unread_count;

#[cfg(test)]
pub(crate) mod test_support;

use serde::Deserialize;

use crate::domain::chat::DEFAULT_MAX_MESSAGE_LENGTH;

pub use append::MessageAppender;
pub use assign_agent::{AssignAgentCommand, AssignAgentHandler, AssignAgentResult};
pub use broker::ChatBroker;
pub use create_or_join_session::{
    CreateOrJoinSessionCommand, CreateOrJoinSessionHandler, CreateOrJoinSessionResult,
};
pub use end_session::{EndSessionCommand, EndSessionHandler};
pub use get_session::{GetSessionHandler, GetSessionQuery};
pub use list_messages::{ListMessagesHandler, ListMessagesQuery};
pub use list_sessions::{ListSessionsHandler, ListSessionsQuery};
pub use mark_read::{MarkReadCommand, MarkReadHandler};
pub use post_message::{PostMessageCommand, PostMessageHandler};
pub use session_locks::SessionLocks;
pub use unread_count::{UnreadCountHandler, UnreadCountQuery};

/// Broker limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ChatPolicy {
    /// How long after its last activity an open session is resumed by
    /// create-or-join.
    pub activity_window_secs: u64,
    /// Longest accepted message body, in characters.
    pub max_message_length: usize,
}

impl Default for ChatPolicy {
    fn default() -> Self {
        Self {
            activity_window_secs: 30 * 60,
            max_message_length: DEFAULT_MAX_MESSAGE_LENGTH,
        }
    }
}
