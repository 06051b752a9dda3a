//! Numbering, persisting and fanning out one message.

use std::sync::Arc;

use crate::domain::chat::{ChatError, ChatMessage, ChatSession, NewChatMessage};
use crate::domain::foundation::Timestamp;
use crate::ports::{ChatRepository, SessionNotifier};

/// Appends drafts to a session.
///
/// Callers must hold the session's lock from `SessionLocks` for the whole
/// load-append cycle; the appender itself does no locking.
#[derive(Clone)]
pub struct MessageAppender {
    repository: Arc<dyn ChatRepository>,
    notifier: Arc<dyn SessionNotifier>,
}

impl MessageAppender {
    pub fn new(repository: Arc<dyn ChatRepository>, notifier: Arc<dyn SessionNotifier>) -> Self {
        Self {
            repository,
            notifier,
        }
    }

    /// Assigns the next id and timestamp, persists, then notifies listeners.
    ///
    /// On error `session` may be left ahead of storage and must be dropped.
    pub async fn append(
        &self,
        session: &mut ChatSession,
        draft: NewChatMessage,
    ) -> Result<ChatMessage, ChatError> {
        let message = draft.into_message(
            session.next_message_id(),
            session.id(),
            session.next_message_timestamp(Timestamp::now()),
        );
        session.record_message(&message)?;
        self.repository.append_message(session, &message).await?;

        tracing::info!(
            session_key = %session.session_key(),
            message_id = %message.id,
            sender_type = %message.sender_type,
            "chat message posted"
        );

        self.notifier
            .message_posted(session.session_key(), &message)
            .await;
        Ok(message)
    }
}
