//! PostMessageHandler - Command handler for posting a chat message.

use std::sync::Arc;

use crate::domain::chat::{ChatError, ChatMessage, MessageBody, NewChatMessage, SenderType};
use crate::domain::foundation::{AuthenticatedUser, ClientMessageId, SessionKey, UserId};
use crate::ports::ChatRepository;

use super::access::{load_authorized, require_agent};
use super::{MessageAppender, SessionLocks};

/// Command to post a message from a visitor or agent.
#[derive(Debug, Clone)]
pub struct PostMessageCommand {
    pub session_key: SessionKey,
    pub body: String,
    pub sender_type: SenderType,
    /// Must match the caller when present; defaults to the caller.
    pub sender_id: Option<UserId>,
    pub client_message_id: Option<ClientMessageId>,
    pub caller: Option<AuthenticatedUser>,
}

/// Handler for posting messages.
///
/// Runs under the session's lock, so ids come out strictly increasing and
/// gap-free, and listeners are notified in id order.
pub struct PostMessageHandler {
    repository: Arc<dyn ChatRepository>,
    appender: MessageAppender,
    locks: Arc<SessionLocks>,
    max_message_length: usize,
}

impl PostMessageHandler {
    pub fn new(
        repository: Arc<dyn ChatRepository>,
        appender: MessageAppender,
        locks: Arc<SessionLocks>,
        max_message_length: usize,
    ) -> Self {
        Self {
            repository,
            appender,
            locks,
            max_message_length,
        }
    }

    pub async fn handle(&self, cmd: PostMessageCommand) -> Result<ChatMessage, ChatError> {
        let caller = cmd.caller.as_ref();

        // 1. Validate sender and body
        if cmd.sender_type == SenderType::System {
            return Err(ChatError::validation(
                "sender_type",
                "system messages are posted by the broker only",
            ));
        }
        if cmd.sender_type == SenderType::Agent {
            require_agent(caller)?;
        }
        let sender_id = resolve_sender(cmd.sender_id, caller)?;
        let body = MessageBody::parse(&cmd.body, self.max_message_length)?;

        // 2. Append under the session lock
        let _guard = self.locks.acquire(&cmd.session_key).await;
        let mut session = load_authorized(self.repository.as_ref(), &cmd.session_key, caller).await?;

        let draft = NewChatMessage::from_party(body, cmd.sender_type, sender_id, cmd.client_message_id);
        self.appender.append(&mut session, draft).await
    }
}

fn resolve_sender(
    claimed: Option<UserId>,
    caller: Option<&AuthenticatedUser>,
) -> Result<Option<UserId>, ChatError> {
    match (claimed, caller) {
        (Some(id), Some(user)) if id == user.id => Ok(Some(id)),
        (Some(_), _) => Err(ChatError::forbidden("sender_id does not match the caller")),
        (None, Some(user)) => Ok(Some(user.id)),
        (None, None) => Ok(None),
    }
}
