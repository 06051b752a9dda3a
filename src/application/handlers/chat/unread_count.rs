//! UnreadCountHandler - Per-viewer unread count.

use std::sync::Arc;

use crate::domain::chat::ChatError;
use crate::domain::foundation::{AuthenticatedUser, SessionKey};
use crate::ports::ChatRepository;

use super::access::{load_authorized, viewer_for};

/// Query for unread messages on one side of a session.
#[derive(Debug, Clone)]
pub struct UnreadCountQuery {
    pub session_key: SessionKey,
    pub as_agent: bool,
    pub caller: Option<AuthenticatedUser>,
}

/// Handler computing the derived unread count.
pub struct UnreadCountHandler {
    repository: Arc<dyn ChatRepository>,
}

impl UnreadCountHandler {
    pub fn new(repository: Arc<dyn ChatRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, query: UnreadCountQuery) -> Result<u64, ChatError> {
        let viewer = viewer_for(query.caller.as_ref(), query.as_agent)?;
        let session =
            load_authorized(self.repository.as_ref(), &query.session_key, query.caller.as_ref())
                .await?;
        Ok(self.repository.unread_count(session.id(), viewer).await?)
    }
}
