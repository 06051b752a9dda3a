//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod chat;

pub use chat::{
    AssignAgentCommand, AssignAgentResult, ChatBroker, ChatPolicy, CreateOrJoinSessionCommand,
    CreateOrJoinSessionResult, EndSessionCommand, GetSessionQuery, ListMessagesQuery,
    ListSessionsQuery, MarkReadCommand, PostMessageCommand, UnreadCountQuery,
};
