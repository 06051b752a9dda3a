//! In-memory chat repository.
//!
//! Backs the broker when no database is configured, and the test suites.
//! Data does not survive a restart.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::chat::{ChatMessage, ChatSession, Viewer, Visitor};
use crate::domain::foundation::{
    ChatSessionId, DomainError, ErrorCode, MessageId, SessionKey, Timestamp,
};
use crate::ports::ChatRepository;

#[derive(Default)]
struct State {
    last_session_id: i64,
    sessions: HashMap<SessionKey, ChatSession>,
    messages: HashMap<ChatSessionId, Vec<ChatMessage>>,
}

/// In-memory implementation of the `ChatRepository` port.
///
/// Thread-safe via an internal `Mutex`; every call is atomic with respect to
/// the others.
#[derive(Default)]
pub struct InMemoryChatRepository {
    state: Mutex<State>,
}

impl InMemoryChatRepository {
    /// Creates an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions.
    pub fn session_count(&self) -> usize {
        self.lock().sessions.len()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock cannot leave `State` half-updated:
        // every mutation is a single insert or push.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(key: &SessionKey) -> DomainError {
    DomainError::new(
        ErrorCode::SessionNotFound,
        format!("Chat session not found: {}", key),
    )
}

#[async_trait]
impl ChatRepository for InMemoryChatRepository {
    async fn create_session(&self, visitor: &Visitor) -> Result<ChatSession, DomainError> {
        let mut state = self.lock();

        let mut key = SessionKey::generate();
        while state.sessions.contains_key(&key) {
            key = SessionKey::generate();
        }

        state.last_session_id += 1;
        let session = ChatSession::new(
            ChatSessionId::new(state.last_session_id),
            key.clone(),
            visitor.clone(),
        );
        state.messages.insert(session.id(), Vec::new());
        state.sessions.insert(key, session.clone());
        Ok(session)
    }

    async fn find_by_key(&self, key: &SessionKey) -> Result<Option<ChatSession>, DomainError> {
        Ok(self.lock().sessions.get(key).cloned())
    }

    async fn find_open_for_visitor(
        &self,
        visitor: &Visitor,
        active_since: &Timestamp,
    ) -> Result<Option<ChatSession>, DomainError> {
        let state = self.lock();
        Ok(state
            .sessions
            .values()
            .filter(|s| s.visitor() == visitor && s.is_active_since(active_since))
            .max_by_key(|s| (*s.last_activity_at(), s.id()))
            .cloned())
    }

    async fn update_session(&self, session: &ChatSession) -> Result<(), DomainError> {
        let mut state = self.lock();
        match state.sessions.get_mut(session.session_key()) {
            Some(stored) => {
                *stored = session.clone();
                Ok(())
            }
            None => Err(not_found(session.session_key())),
        }
    }

    async fn append_message(
        &self,
        session: &ChatSession,
        message: &ChatMessage,
    ) -> Result<(), DomainError> {
        let mut state = self.lock();
        if !state.sessions.contains_key(session.session_key()) {
            return Err(not_found(session.session_key()));
        }

        let messages = state.messages.entry(session.id()).or_default();
        if let Some(last) = messages.last() {
            if last.id >= message.id {
                return Err(DomainError::new(
                    ErrorCode::DatabaseError,
                    format!(
                        "Message id {} does not follow {} in session {}",
                        message.id,
                        last.id,
                        session.session_key()
                    ),
                ));
            }
        }
        messages.push(message.clone());
        state
            .sessions
            .insert(session.session_key().clone(), session.clone());
        Ok(())
    }

    async fn list_messages(
        &self,
        session_id: ChatSessionId,
        since: Option<MessageId>,
    ) -> Result<Vec<ChatMessage>, DomainError> {
        let state = self.lock();
        Ok(state
            .messages
            .get(&session_id)
            .map(|messages| {
                messages
                    .iter()
                    .filter(|m| since.map_or(true, |since| m.id > since))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn mark_read(
        &self,
        session_id: ChatSessionId,
        viewer: Viewer,
        up_to: Option<MessageId>,
    ) -> Result<u64, DomainError> {
        let mut state = self.lock();
        let mut marked = 0;
        if let Some(messages) = state.messages.get_mut(&session_id) {
            for message in messages.iter_mut().filter(|m| {
                !m.is_read
                    && viewer.receives(m.sender_type)
                    && up_to.map_or(true, |up_to| m.id <= up_to)
            }) {
                message.is_read = true;
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn unread_count(
        &self,
        session_id: ChatSessionId,
        viewer: Viewer,
    ) -> Result<u64, DomainError> {
        let state = self.lock();
        Ok(state
            .messages
            .get(&session_id)
            .map(|messages| {
                messages
                    .iter()
                    .filter(|m| !m.is_read && viewer.receives(m.sender_type))
                    .count() as u64
            })
            .unwrap_or(0))
    }

    async fn list_sessions(&self, include_ended: bool) -> Result<Vec<ChatSession>, DomainError> {
        let state = self.lock();
        let mut sessions: Vec<ChatSession> = state
            .sessions
            .values()
            .filter(|s| include_ended || s.is_open())
            .cloned()
            .collect();
        sessions.sort_by(|a, b| {
            b.last_activity_at()
                .cmp(a.last_activity_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        Ok(sessions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chat::{MessageBody, NewChatMessage, SenderType};
    use crate::domain::foundation::UserId;

    async fn post(
        repo: &InMemoryChatRepository,
        session: &mut ChatSession,
        sender: SenderType,
        text: &str,
    ) -> ChatMessage {
        let draft = match sender {
            SenderType::System => NewChatMessage::system(text),
            other => NewChatMessage::from_party(
                MessageBody::parse(text, 100).unwrap(),
                other,
                Some(UserId::new(1)),
                None,
            ),
        };
        let message = draft.into_message(
            session.next_message_id(),
            session.id(),
            session.next_message_timestamp(Timestamp::now()),
        );
        session.record_message(&message).unwrap();
        repo.append_message(session, &message).await.unwrap();
        message
    }

    #[tokio::test]
    async fn create_session_assigns_distinct_ids_and_keys() {
        let repo = InMemoryChatRepository::new();
        let a = repo.create_session(&Visitor::anonymous("ip:1")).await.unwrap();
        let b = repo.create_session(&Visitor::anonymous("ip:2")).await.unwrap();

        assert_ne!(a.id(), b.id());
        assert_ne!(a.session_key(), b.session_key());
        assert_eq!(repo.session_count(), 2);
    }

    #[tokio::test]
    async fn find_open_for_visitor_ignores_ended_and_stale_sessions() {
        let repo = InMemoryChatRepository::new();
        let visitor = Visitor::user(UserId::new(42));
        let mut session = repo.create_session(&visitor).await.unwrap();

        let since = Timestamp::now().minus_secs(60);
        let found = repo.find_open_for_visitor(&visitor, &since).await.unwrap();
        assert_eq!(found.as_ref().map(|s| s.id()), Some(session.id()));

        let later = Timestamp::now().plus_secs(60);
        assert!(repo.find_open_for_visitor(&visitor, &later).await.unwrap().is_none());

        session.end().unwrap();
        repo.update_session(&session).await.unwrap();
        assert!(repo.find_open_for_visitor(&visitor, &since).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_messages_filters_by_since_id() {
        let repo = InMemoryChatRepository::new();
        let mut session = repo.create_session(&Visitor::anonymous("ip:1")).await.unwrap();
        let first = post(&repo, &mut session, SenderType::User, "a").await;
        let second = post(&repo, &mut session, SenderType::User, "b").await;

        let all = repo.list_messages(session.id(), None).await.unwrap();
        assert_eq!(all, vec![first.clone(), second.clone()]);

        let newer = repo.list_messages(session.id(), Some(first.id)).await.unwrap();
        assert_eq!(newer, vec![second]);

        let stored = repo.find_by_key(session.session_key()).await.unwrap().unwrap();
        assert_eq!(stored.last_message_id(), Some(MessageId::new(2)));
    }

    #[tokio::test]
    async fn append_message_rejects_reused_id() {
        let repo = InMemoryChatRepository::new();
        let mut session = repo.create_session(&Visitor::anonymous("ip:1")).await.unwrap();
        let first = post(&repo, &mut session, SenderType::User, "a").await;

        let err = repo.append_message(&session, &first).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[tokio::test]
    async fn unread_counts_are_per_viewer_and_only_drop_on_mark_read() {
        let repo = InMemoryChatRepository::new();
        let mut session = repo.create_session(&Visitor::anonymous("ip:1")).await.unwrap();
        post(&repo, &mut session, SenderType::User, "hello").await;
        let agent_reply = post(&repo, &mut session, SenderType::Agent, "hi").await;
        post(&repo, &mut session, SenderType::System, "Agent joined").await;

        assert_eq!(repo.unread_count(session.id(), Viewer::Agent).await.unwrap(), 1);
        assert_eq!(repo.unread_count(session.id(), Viewer::Visitor).await.unwrap(), 2);

        let marked = repo
            .mark_read(session.id(), Viewer::Visitor, Some(agent_reply.id))
            .await
            .unwrap();
        assert_eq!(marked, 1);
        assert_eq!(repo.unread_count(session.id(), Viewer::Visitor).await.unwrap(), 1);

        // Marking again changes nothing and never goes negative.
        let marked = repo.mark_read(session.id(), Viewer::Visitor, None).await.unwrap();
        assert_eq!(marked, 1);
        let marked = repo.mark_read(session.id(), Viewer::Visitor, None).await.unwrap();
        assert_eq!(marked, 0);
        assert_eq!(repo.unread_count(session.id(), Viewer::Visitor).await.unwrap(), 0);
        assert_eq!(repo.unread_count(session.id(), Viewer::Agent).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn list_sessions_hides_ended_unless_requested() {
        let repo = InMemoryChatRepository::new();
        let open = repo.create_session(&Visitor::anonymous("ip:1")).await.unwrap();
        let mut ended = repo.create_session(&Visitor::anonymous("ip:2")).await.unwrap();
        ended.end().unwrap();
        repo.update_session(&ended).await.unwrap();

        let listed = repo.list_sessions(false).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id(), open.id());

        assert_eq!(repo.list_sessions(true).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_unknown_session_is_not_found() {
        let repo = InMemoryChatRepository::new();
        let session = ChatSession::new(
            ChatSessionId::new(99),
            SessionKey::new("missing").unwrap(),
            Visitor::anonymous("ip:1"),
        );
        let err = repo.update_session(&session).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::SessionNotFound);
    }
}
