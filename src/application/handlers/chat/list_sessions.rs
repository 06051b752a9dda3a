//! ListSessionsHandler - Session list for agent panels.

use std::sync::Arc;

use crate::domain::chat::{ChatError, ChatSessionSummary, Viewer};
use crate::domain::foundation::AuthenticatedUser;
use crate::ports::ChatRepository;

use super::access::require_agent;

/// Query for the agent session list.
#[derive(Debug, Clone)]
pub struct ListSessionsQuery {
    pub include_ended: bool,
    pub caller: Option<AuthenticatedUser>,
}

/// Handler listing sessions with agent-side unread counts, most recently
/// active first.
pub struct ListSessionsHandler {
    repository: Arc<dyn ChatRepository>,
}

impl ListSessionsHandler {
    pub fn new(repository: Arc<dyn ChatRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(
        &self,
        query: ListSessionsQuery,
    ) -> Result<Vec<ChatSessionSummary>, ChatError> {
        require_agent(query.caller.as_ref())?;

        let sessions = self.repository.list_sessions(query.include_ended).await?;
        let mut summaries = Vec::with_capacity(sessions.len());
        for session in sessions {
            let unread_count = self
                .repository
                .unread_count(session.id(), Viewer::Agent)
                .await?;
            summaries.push(ChatSessionSummary {
                session,
                unread_count,
            });
        }
        Ok(summaries)
    }
}
