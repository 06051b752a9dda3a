//! ChatBroker - The server-side session broker.
//!
//! Bundles the chat handlers over one repository, one notifier and one set of
//! session locks, and is the single entry point the HTTP and socket adapters
//! call into.

use std::sync::Arc;

use crate::domain::chat::{ChatError, ChatMessage, ChatSession, ChatSessionSummary};
use crate::ports::{ChatRepository, SessionNotifier};

use super::{
    AssignAgentCommand, AssignAgentHandler, AssignAgentResult, ChatPolicy,
    CreateOrJoinSessionCommand, CreateOrJoinSessionHandler, CreateOrJoinSessionResult,
    EndSessionCommand, EndSessionHandler, GetSessionHandler, GetSessionQuery, ListMessagesHandler,
    ListMessagesQuery, ListSessionsHandler, ListSessionsQuery, MarkReadCommand, MarkReadHandler,
    MessageAppender, PostMessageCommand, PostMessageHandler, SessionLocks, UnreadCountHandler,
    UnreadCountQuery,
};

/// Server-side chat session broker.
pub struct ChatBroker {
    create_or_join: CreateOrJoinSessionHandler,
    get_session: GetSessionHandler,
    post_message: PostMessageHandler,
    assign_agent: AssignAgentHandler,
    end_session: EndSessionHandler,
    list_messages: ListMessagesHandler,
    mark_read: MarkReadHandler,
    unread_count: UnreadCountHandler,
    list_sessions: ListSessionsHandler,
}

impl ChatBroker {
    pub fn new(
        repository: Arc<dyn ChatRepository>,
        notifier: Arc<dyn SessionNotifier>,
        policy: ChatPolicy,
    ) -> Self {
        let locks = Arc::new(SessionLocks::new());
        let appender = MessageAppender::new(repository.clone(), notifier);

        Self {
            create_or_join: CreateOrJoinSessionHandler::new(
                repository.clone(),
                policy.activity_window_secs,
            ),
            get_session: GetSessionHandler::new(repository.clone()),
            post_message: PostMessageHandler::new(
                repository.clone(),
                appender.clone(),
                locks.clone(),
                policy.max_message_length,
            ),
            assign_agent: AssignAgentHandler::new(repository.clone(), appender.clone(), locks.clone()),
            end_session: EndSessionHandler::new(repository.clone(), appender, locks),
            list_messages: ListMessagesHandler::new(repository.clone()),
            mark_read: MarkReadHandler::new(repository.clone()),
            unread_count: UnreadCountHandler::new(repository.clone()),
            list_sessions: ListSessionsHandler::new(repository),
        }
    }

    pub async fn create_or_join_session(
        &self,
        cmd: CreateOrJoinSessionCommand,
    ) -> Result<CreateOrJoinSessionResult, ChatError> {
        self.create_or_join.handle(cmd).await
    }

    pub async fn get_session(&self, query: GetSessionQuery) -> Result<ChatSession, ChatError> {
        self.get_session.handle(query).await
    }

    pub async fn post_message(&self, cmd: PostMessageCommand) -> Result<ChatMessage, ChatError> {
        self.post_message.handle(cmd).await
    }

    pub async fn assign_agent(
        &self,
        cmd: AssignAgentCommand,
    ) -> Result<AssignAgentResult, ChatError> {
        self.assign_agent.handle(cmd).await
    }

    pub async fn end_session(&self, cmd: EndSessionCommand) -> Result<ChatSession, ChatError> {
        self.end_session.handle(cmd).await
    }

    pub async fn list_messages(
        &self,
        query: ListMessagesQuery,
    ) -> Result<Vec<ChatMessage>, ChatError> {
        self.list_messages.handle(query).await
    }

    pub async fn mark_read(&self, cmd: MarkReadCommand) -> Result<u64, ChatError> {
        self.mark_read.handle(cmd).await
    }

    pub async fn unread_count(&self, query: UnreadCountQuery) -> Result<u64, ChatError> {
        self.unread_count.handle(query).await
    }

    pub async fn list_sessions(
        &self,
        query: ListSessionsQuery,
    ) -> Result<Vec<ChatSessionSummary>, ChatError> {
        self.list_sessions.handle(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::handlers::chat::test_support::{agent, customer, RecordingNotifier};
    use crate::adapters::memory::InMemoryChatRepository;
    use crate::domain::chat::{ChatSessionStatus, SenderType};
    use crate::domain::foundation::{AuthenticatedUser, SessionKey, UserId};

    fn broker() -> (ChatBroker, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let broker = ChatBroker::new(
            Arc::new(InMemoryChatRepository::new()),
            notifier.clone(),
            ChatPolicy::default(),
        );
        (broker, notifier)
    }

    fn post(key: &SessionKey, body: &str, caller: AuthenticatedUser) -> PostMessageCommand {
        PostMessageCommand {
            session_key: key.clone(),
            body: body.to_string(),
            sender_type: SenderType::from_is_agent(caller.is_agent()),
            sender_id: None,
            client_message_id: None,
            caller: Some(caller),
        }
    }

    #[tokio::test]
    async fn assign_then_end_then_post_is_rejected() {
        let (broker, _) = broker();
        let session = broker
            .create_or_join_session(CreateOrJoinSessionCommand {
                caller: Some(customer(42)),
                client_addr: "10.0.0.1".to_string(),
            })
            .await
            .unwrap()
            .session;
        let key = session.session_key().clone();

        broker
            .assign_agent(AssignAgentCommand {
                session_key: key.clone(),
                agent_id: UserId::new(7),
                caller: Some(agent(7)),
            })
            .await
            .unwrap();
        broker
            .end_session(EndSessionCommand {
                session_key: key.clone(),
                caller: Some(agent(7)),
            })
            .await
            .unwrap();

        let before = broker
            .get_session(GetSessionQuery {
                session_key: key.clone(),
                caller: Some(customer(42)),
            })
            .await
            .unwrap();

        let result = broker.post_message(post(&key, "c", customer(42))).await;
        assert!(matches!(result, Err(ChatError::SessionEnded(_))));

        let after = broker
            .get_session(GetSessionQuery {
                session_key: key,
                caller: Some(customer(42)),
            })
            .await
            .unwrap();
        assert_eq!(after.status(), ChatSessionStatus::Ended);
        assert_eq!(after.last_message_id(), before.last_message_id());
    }

    #[tokio::test]
    async fn conversation_flows_to_listeners_and_polling_alike() {
        let (broker, notifier) = broker();
        let key = broker
            .create_or_join_session(CreateOrJoinSessionCommand {
                caller: Some(customer(42)),
                client_addr: "10.0.0.1".to_string(),
            })
            .await
            .unwrap()
            .session
            .session_key()
            .clone();

        broker.post_message(post(&key, "hello", customer(42))).await.unwrap();
        broker
            .assign_agent(AssignAgentCommand {
                session_key: key.clone(),
                agent_id: UserId::new(7),
                caller: Some(agent(7)),
            })
            .await
            .unwrap();
        broker.post_message(post(&key, "hi, how can I help?", agent(7))).await.unwrap();

        let polled = broker
            .list_messages(ListMessagesQuery {
                session_key: key.clone(),
                since_id: None,
                caller: Some(customer(42)),
            })
            .await
            .unwrap();
        let fanned: Vec<ChatMessage> = notifier.posted().into_iter().map(|(_, m)| m).collect();
        assert_eq!(polled, fanned);
        assert_eq!(polled.len(), 3);

        let unread = broker
            .unread_count(UnreadCountQuery {
                session_key: key,
                as_agent: false,
                caller: Some(customer(42)),
            })
            .await
            .unwrap();
        assert_eq!(unread, 2);
    }
}
