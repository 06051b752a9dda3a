//! EndSessionHandler - Command handler for ending a chat.

use std::sync::Arc;

use crate::domain::chat::{ChatError, ChatSession, NewChatMessage};
use crate::domain::foundation::{AuthenticatedUser, SessionKey};
use crate::ports::ChatRepository;

use super::access::load_authorized;
use super::{MessageAppender, SessionLocks};

/// Command to end a session.
#[derive(Debug, Clone)]
pub struct EndSessionCommand {
    pub session_key: SessionKey,
    pub caller: Option<AuthenticatedUser>,
}

/// Handler for ending sessions.
///
/// Either party may end the chat. A closing notice is posted while the
/// session is still open, then the session moves to `ended` and accepts
/// nothing further.
pub struct EndSessionHandler {
    repository: Arc<dyn ChatRepository>,
    appender: MessageAppender,
    locks: Arc<SessionLocks>,
}

impl EndSessionHandler {
    pub fn new(
        repository: Arc<dyn ChatRepository>,
        appender: MessageAppender,
        locks: Arc<SessionLocks>,
    ) -> Self {
        Self {
            repository,
            appender,
            locks,
        }
    }

    pub async fn handle(&self, cmd: EndSessionCommand) -> Result<ChatSession, ChatError> {
        let _guard = self.locks.acquire(&cmd.session_key).await;
        let mut session =
            load_authorized(self.repository.as_ref(), &cmd.session_key, cmd.caller.as_ref())
                .await?;

        if !session.is_open() {
            return Err(ChatError::session_ended(cmd.session_key));
        }

        self.appender
            .append(&mut session, NewChatMessage::system("Chat ended"))
            .await?;
        session.end()?;
        self.repository.update_session(&session).await?;

        tracing::info!(session_key = %cmd.session_key, "chat session ended");
        Ok(session)
    }
}
