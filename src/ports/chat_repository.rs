//! Chat repository port.
//!
//! Persists chat sessions and their messages. The broker serializes writes
//! per session, so implementations only need to keep each call atomic.

use async_trait::async_trait;

use crate::domain::chat::{ChatMessage, ChatSession, Viewer, Visitor};
use crate::domain::foundation::{ChatSessionId, DomainError, MessageId, SessionKey, Timestamp};

/// Repository port for chat sessions and messages.
///
/// # Contract
///
/// - `create_session` assigns both the numeric id and a fresh session key
/// - `list_messages` returns messages in strictly increasing id order
/// - `append_message` stores the message and the session's updated sequence
///   in one step; a partially applied append must not be observable
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Create and store a new active session for the visitor.
    ///
    /// # Errors
    ///
    /// - `DatabaseError` on persistence failure
    async fn create_session(&self, visitor: &Visitor) -> Result<ChatSession, DomainError>;

    /// Find a session by key. Returns `None` if not found.
    async fn find_by_key(&self, key: &SessionKey) -> Result<Option<ChatSession>, DomainError>;

    /// Most recently active open session of this visitor whose last
    /// activity is at or after `active_since`.
    async fn find_open_for_visitor(
        &self,
        visitor: &Visitor,
        active_since: &Timestamp,
    ) -> Result<Option<ChatSession>, DomainError>;

    /// Persist status, assignment and timestamps of an existing session.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the session doesn't exist
    /// - `DatabaseError` on persistence failure
    async fn update_session(&self, session: &ChatSession) -> Result<(), DomainError>;

    /// Store a numbered message together with the session that recorded it.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the session doesn't exist
    /// - `DatabaseError` on persistence failure, including a duplicate id
    async fn append_message(
        &self,
        session: &ChatSession,
        message: &ChatMessage,
    ) -> Result<(), DomainError>;

    /// Messages of a session with id greater than `since` (all when `None`).
    async fn list_messages(
        &self,
        session_id: ChatSessionId,
        since: Option<MessageId>,
    ) -> Result<Vec<ChatMessage>, DomainError>;

    /// Mark messages addressed to `viewer` as read, up to and including
    /// `up_to` (all when `None`). Returns how many changed.
    async fn mark_read(
        &self,
        session_id: ChatSessionId,
        viewer: Viewer,
        up_to: Option<MessageId>,
    ) -> Result<u64, DomainError>;

    /// Messages addressed to `viewer` that are not yet read.
    async fn unread_count(
        &self,
        session_id: ChatSessionId,
        viewer: Viewer,
    ) -> Result<u64, DomainError>;

    /// All sessions, most recently active first. Ended sessions only when
    /// `include_ended` is set.
    async fn list_sessions(&self, include_ended: bool) -> Result<Vec<ChatSession>, DomainError>;
}
