//! AssignAgentHandler - Command handler for assigning or transferring a chat.

use std::sync::Arc;

use crate::domain::chat::{AgentAssignment, ChatError, ChatMessage, ChatSession, NewChatMessage};
use crate::domain::foundation::{AuthenticatedUser, SessionKey, UserId};
use crate::ports::ChatRepository;

use super::access::{load_session, require_agent};
use super::{MessageAppender, SessionLocks};

/// Command to assign an agent to a session.
#[derive(Debug, Clone)]
pub struct AssignAgentCommand {
    pub session_key: SessionKey,
    pub agent_id: UserId,
    pub caller: Option<AuthenticatedUser>,
}

/// Result of an assignment.
#[derive(Debug, Clone)]
pub struct AssignAgentResult {
    pub session: ChatSession,
    pub assignment: AgentAssignment,
    /// System notice posted for the change, if anything changed.
    pub notice: Option<ChatMessage>,
}

/// Handler for agent assignment.
///
/// Allowed in every status except `ended`. A change of agent is announced
/// to all parties with a system message.
pub struct AssignAgentHandler {
    repository: Arc<dyn ChatRepository>,
    appender: MessageAppender,
    locks: Arc<SessionLocks>,
}

impl AssignAgentHandler {
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

    pub async fn handle(&self, cmd: AssignAgentCommand) -> Result<AssignAgentResult, ChatError> {
        require_agent(cmd.caller.as_ref())?;

        let _guard = self.locks.acquire(&cmd.session_key).await;
        let mut session = load_session(self.repository.as_ref(), &cmd.session_key).await?;

        let assignment = session.assign_agent(cmd.agent_id)?;
        let notice_text = match assignment {
            AgentAssignment::Unchanged => None,
            AgentAssignment::Assigned => Some(format!("Agent {} joined the chat", cmd.agent_id)),
            AgentAssignment::Transferred { previous } => Some(format!(
                "Chat transferred from agent {} to agent {}",
                previous, cmd.agent_id
            )),
        };

        // The notice persists the assignment together with the message.
        let notice = match notice_text {
            Some(text) => Some(
                self.appender
                    .append(&mut session, NewChatMessage::system(text))
                    .await?,
            ),
            None => None,
        };

        tracing::info!(
            session_key = %cmd.session_key,
            agent_id = %cmd.agent_id,
            status = %session.status(),
            ?assignment,
            "chat agent assigned"
        );

        Ok(AssignAgentResult {
            session,
            assignment,
            notice,
        })
    }
}
