//! Shared fixtures for chat handler tests.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::adapters::memory::InMemoryChatRepository;
use crate::domain::chat::{ChatMessage, ChatSession, Visitor};
use crate::domain::foundation::{AuthenticatedUser, SessionKey, UserId};
use crate::ports::{ChatRepository, SessionNotifier};

use super::{MessageAppender, SessionLocks};

/// Notifier that records every fan-out.
#[derive(Default)]
pub struct RecordingNotifier {
    posted: Mutex<Vec<(SessionKey, ChatMessage)>>,
}

impl RecordingNotifier {
    pub fn posted(&self) -> Vec<(SessionKey, ChatMessage)> {
        self.posted.lock().unwrap().clone()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.posted().into_iter().map(|(_, m)| m.body).collect()
    }
}

#[async_trait]
impl SessionNotifier for RecordingNotifier {
    async fn message_posted(&self, session_key: &SessionKey, message: &ChatMessage) {
        self.posted
            .lock()
            .unwrap()
            .push((session_key.clone(), message.clone()));
    }
}

pub struct Fixture {
    pub repository: Arc<InMemoryChatRepository>,
    pub notifier: Arc<RecordingNotifier>,
    pub locks: Arc<SessionLocks>,
    pub appender: MessageAppender,
}

impl Fixture {
    pub fn new() -> Self {
        let repository = Arc::new(InMemoryChatRepository::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let appender = MessageAppender::new(repository.clone(), notifier.clone());
        Self {
            repository,
            notifier,
            locks: Arc::new(SessionLocks::new()),
            appender,
        }
    }

    pub async fn session_for(&self, visitor: Visitor) -> ChatSession {
        self.repository.create_session(&visitor).await.unwrap()
    }

    pub async fn reload(&self, session: &ChatSession) -> ChatSession {
        self.repository
            .find_by_key(session.session_key())
            .await
            .unwrap()
            .unwrap()
    }
}

pub fn customer(id: i64) -> AuthenticatedUser {
    AuthenticatedUser::customer(UserId::new(id))
}

pub fn agent(id: i64) -> AuthenticatedUser {
    AuthenticatedUser::agent(UserId::new(id))
}
