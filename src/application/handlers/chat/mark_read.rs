//! MarkReadHandler - Read acknowledgements.

use std::sync::Arc;

use crate::domain::chat::ChatError;
use crate::domain::foundation::{AuthenticatedUser, MessageId, SessionKey};
use crate::ports::ChatRepository;

use super::access::{load_authorized, viewer_for};

/// Command to acknowledge messages as read.
#[derive(Debug, Clone)]
pub struct MarkReadCommand {
    pub session_key: SessionKey,
    /// Acknowledge on the agent side rather than the visitor side.
    pub as_agent: bool,
    /// Acknowledge up to and including this id; everything when `None`.
    pub up_to: Option<MessageId>,
    pub caller: Option<AuthenticatedUser>,
}

/// Handler for read acknowledgements.
///
/// Only messages addressed to the acknowledging side change. Returns how many
/// were newly marked.
pub struct MarkReadHandler {
    repository: Arc<dyn ChatRepository>,
}

impl MarkReadHandler {
    pub fn new(repository: Arc<dyn ChatRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, cmd: MarkReadCommand) -> Result<u64, ChatError> {
        let viewer = viewer_for(cmd.caller.as_ref(), cmd.as_agent)?;
        let session =
            load_authorized(self.repository.as_ref(), &cmd.session_key, cmd.caller.as_ref())
                .await?;

        let marked = self
            .repository
            .mark_read(session.id(), viewer, cmd.up_to)
            .await?;

        tracing::debug!(session_key = %cmd.session_key, ?viewer, marked, "chat messages marked read");
        Ok(marked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::chat::test_support::{agent, customer, Fixture};
    use crate::application::handlers::chat::{UnreadCountHandler, UnreadCountQuery};
    use crate::domain::chat::{NewChatMessage, Visitor};
    use crate::domain::foundation::UserId;

    #[tokio::test]
    async fn visitor_acknowledges_agent_side_messages() {
        let fx = Fixture::new();
        let mut session = fx.session_for(Visitor::user(UserId::new(42))).await;
        fx.appender
            .append(&mut session, NewChatMessage::system("Agent 7 joined the chat"))
            .await
            .unwrap();

        let unread = UnreadCountHandler::new(fx.repository.clone());
        let query = UnreadCountQuery {
            session_key: session.session_key().clone(),
            as_agent: false,
            caller: Some(customer(42)),
        };
        assert_eq!(unread.handle(query.clone()).await.unwrap(), 1);

        let marked = MarkReadHandler::new(fx.repository.clone())
            .handle(MarkReadCommand {
                session_key: session.session_key().clone(),
                as_agent: false,
                up_to: None,
                caller: Some(customer(42)),
            })
            .await
            .unwrap();
        assert_eq!(marked, 1);
        assert_eq!(unread.handle(query).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn agent_side_requires_agent() {
        let fx = Fixture::new();
        let session = fx.session_for(Visitor::user(UserId::new(42))).await;
        let handler = MarkReadHandler::new(fx.repository.clone());

        let denied = handler
            .handle(MarkReadCommand {
                session_key: session.session_key().clone(),
                as_agent: true,
                up_to: None,
                caller: Some(customer(42)),
            })
            .await;
        assert!(matches!(denied, Err(ChatError::Forbidden(_))));

        let allowed = handler
            .handle(MarkReadCommand {
                session_key: session.session_key().clone(),
                as_agent: true,
                up_to: None,
                caller: Some(agent(7)),
            })
            .await;
        assert_eq!(allowed.unwrap(), 0);
    }
}
