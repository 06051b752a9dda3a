//! ListMessagesHandler - Query handler backing the polling resource.

use std::sync::Arc;

use crate::domain::chat::{ChatError, ChatMessage};
use crate::domain::foundation::{AuthenticatedUser, MessageId, SessionKey};
use crate::ports::ChatRepository;

use super::access::load_authorized;

/// Query for a session's messages.
#[derive(Debug, Clone)]
pub struct ListMessagesQuery {
    pub session_key: SessionKey,
    /// Only messages with a greater id.
    pub since_id: Option<MessageId>,
    pub caller: Option<AuthenticatedUser>,
}

/// Handler for listing messages in strictly increasing id order.
pub struct ListMessagesHandler {
    repository: Arc<dyn ChatRepository>,
}

impl ListMessagesHandler {
    pub fn new(repository: Arc<dyn ChatRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, query: ListMessagesQuery) -> Result<Vec<ChatMessage>, ChatError> {
        let session =
            load_authorized(self.repository.as_ref(), &query.session_key, query.caller.as_ref())
                .await?;

        Ok(self
            .repository
            .list_messages(session.id(), query.since_id)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::chat::test_support::{agent, customer, Fixture};
    use crate::application::handlers::chat::{PostMessageCommand, PostMessageHandler};
    use crate::domain::chat::{SenderType, Visitor};
    use crate::domain::foundation::UserId;

    #[tokio::test]
    async fn lists_all_then_only_newer_messages() {
        let fx = Fixture::new();
        let session = fx.session_for(Visitor::user(UserId::new(42))).await;
        let poster =
            PostMessageHandler::new(fx.repository.clone(), fx.appender.clone(), fx.locks.clone(), 2000);
        for body in ["a", "b", "c"] {
            poster
                .handle(PostMessageCommand {
                    session_key: session.session_key().clone(),
                    body: body.to_string(),
                    sender_type: SenderType::User,
                    sender_id: None,
                    client_message_id: None,
                    caller: Some(customer(42)),
                })
                .await
                .unwrap();
        }

        let handler = ListMessagesHandler::new(fx.repository.clone());
        let all = handler
            .handle(ListMessagesQuery {
                session_key: session.session_key().clone(),
                since_id: None,
                caller: Some(agent(7)),
            })
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let newer = handler
            .handle(ListMessagesQuery {
                session_key: session.session_key().clone(),
                since_id: Some(all[1].id),
                caller: Some(customer(42)),
            })
            .await
            .unwrap();
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0].body, "c");
    }

    #[tokio::test]
    async fn strangers_cannot_read_private_session() {
        let fx = Fixture::new();
        let session = fx.session_for(Visitor::user(UserId::new(42))).await;

        let result = ListMessagesHandler::new(fx.repository.clone())
            .handle(ListMessagesQuery {
                session_key: session.session_key().clone(),
                since_id: None,
                caller: None,
            })
            .await;
        assert!(matches!(result, Err(ChatError::Forbidden(_))));
    }
}
