//! CreateOrJoinSessionHandler - Opens a chat or resumes the caller's open one.

use std::sync::Arc;

use tokio::sync::Mutex;

use crate::domain::chat::{ChatError, ChatSession, Visitor};
use crate::domain::foundation::{AuthenticatedUser, Timestamp};
use crate::ports::ChatRepository;

/// Command to start (or resume) a chat.
#[derive(Debug, Clone)]
pub struct CreateOrJoinSessionCommand {
    pub caller: Option<AuthenticatedUser>,
    /// Client address, used to identify anonymous visitors.
    pub client_addr: String,
}

/// Result of a create-or-join.
#[derive(Debug, Clone)]
pub struct CreateOrJoinSessionResult {
    pub session: ChatSession,
    /// False when an existing session was returned.
    pub created: bool,
}

/// Handler for starting chats.
///
/// Idempotent per visitor within the activity window: a visitor with an open
/// session active since `now - activity_window` gets that session back.
pub struct CreateOrJoinSessionHandler {
    repository: Arc<dyn ChatRepository>,
    activity_window_secs: u64,
    // Serializes lookup-then-create so two tabs cannot open two sessions.
    creating: Mutex<()>,
}

impl CreateOrJoinSessionHandler {
    pub fn new(repository: Arc<dyn ChatRepository>, activity_window_secs: u64) -> Self {
        Self {
            repository,
            activity_window_secs,
            creating: Mutex::new(()),
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateOrJoinSessionCommand,
    ) -> Result<CreateOrJoinSessionResult, ChatError> {
        let visitor = Visitor::from_caller(cmd.caller.as_ref().map(|c| c.id), &cmd.client_addr);
        let active_since = Timestamp::now().minus_secs(self.activity_window_secs);

        let _guard = self.creating.lock().await;

        if let Some(session) = self
            .repository
            .find_open_for_visitor(&visitor, &active_since)
            .await?
        {
            tracing::debug!(session_key = %session.session_key(), visitor = %visitor, "resuming chat session");
            return Ok(CreateOrJoinSessionResult {
                session,
                created: false,
            });
        }

        let session = self.repository.create_session(&visitor).await?;
        tracing::info!(
            session_key = %session.session_key(),
            session_id = %session.id(),
            visitor = %visitor,
            "chat session created"
        );

        Ok(CreateOrJoinSessionResult {
            session,
            created: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryChatRepository;
    use crate::domain::foundation::UserId;

    fn handler() -> (CreateOrJoinSessionHandler, Arc<InMemoryChatRepository>) {
        let repo = Arc::new(InMemoryChatRepository::new());
        (CreateOrJoinSessionHandler::new(repo.clone(), 1800), repo)
    }

    fn cmd(caller: Option<AuthenticatedUser>, addr: &str) -> CreateOrJoinSessionCommand {
        CreateOrJoinSessionCommand {
            caller,
            client_addr: addr.to_string(),
        }
    }

    #[tokio::test]
    async fn creates_session_for_new_user() {
        let (handler, _) = handler();
        let result = handler
            .handle(cmd(Some(AuthenticatedUser::customer(UserId::new(42))), "10.0.0.1"))
            .await
            .unwrap();

        assert!(result.created);
        assert_eq!(result.session.visitor().user_id(), Some(UserId::new(42)));
    }

    #[tokio::test]
    async fn returns_existing_open_session_for_same_user() {
        let (handler, repo) = handler();
        let caller = Some(AuthenticatedUser::customer(UserId::new(42)));
        let first = handler.handle(cmd(caller.clone(), "10.0.0.1")).await.unwrap();
        let second = handler.handle(cmd(caller, "10.0.0.2")).await.unwrap();

        assert!(!second.created);
        assert_eq!(first.session.session_key(), second.session.session_key());
        assert_eq!(repo.session_count(), 1);
    }

    #[tokio::test]
    async fn anonymous_visitors_are_keyed_by_address() {
        let (handler, repo) = handler();
        let a = handler.handle(cmd(None, "10.0.0.1")).await.unwrap();
        let again = handler.handle(cmd(None, "10.0.0.1")).await.unwrap();
        let b = handler.handle(cmd(None, "10.0.0.2")).await.unwrap();

        assert_eq!(a.session.session_key(), again.session.session_key());
        assert_ne!(a.session.session_key(), b.session.session_key());
        assert_eq!(repo.session_count(), 2);
    }

    #[tokio::test]
    async fn ended_session_is_not_resumed() {
        let (handler, repo) = handler();
        let caller = Some(AuthenticatedUser::customer(UserId::new(42)));
        let first = handler.handle(cmd(caller.clone(), "10.0.0.1")).await.unwrap();

        let mut ended = first.session.clone();
        ended.end().unwrap();
        repo.update_session(&ended).await.unwrap();

        let second = handler.handle(cmd(caller, "10.0.0.1")).await.unwrap();
        assert!(second.created);
        assert_ne!(first.session.session_key(), second.session.session_key());
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_session() {
        let (handler, repo) = handler();
        let handler = Arc::new(handler);
        let caller = Some(AuthenticatedUser::customer(UserId::new(42)));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let handler = handler.clone();
                let caller = caller.clone();
                tokio::spawn(async move { handler.handle(cmd(caller, "10.0.0.1")).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(repo.session_count(), 1);
    }
}
