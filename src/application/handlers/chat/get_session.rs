//! GetSessionHandler - Query handler for a single chat session.

use std::sync::Arc;

use crate::domain::chat::{ChatError, ChatSession};
use crate::domain::foundation::{AuthenticatedUser, SessionKey};
use crate::ports::ChatRepository;

use super::access::load_authorized;

/// Query to get a session by key.
#[derive(Debug, Clone)]
pub struct GetSessionQuery {
    pub session_key: SessionKey,
    pub caller: Option<AuthenticatedUser>,
}

/// Handler for retrieving session details.
pub struct GetSessionHandler {
    repository: Arc<dyn ChatRepository>,
}

impl GetSessionHandler {
    pub fn new(repository: Arc<dyn ChatRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, query: GetSessionQuery) -> Result<ChatSession, ChatError> {
        load_authorized(self.repository.as_ref(), &query.session_key, query.caller.as_ref()).await
    }
}
