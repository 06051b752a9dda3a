//! Shared lookup and permission checks for chat handlers.

use crate::domain::chat::{ChatError, ChatSession, Viewer};
use crate::domain::foundation::{AuthenticatedUser, SessionKey};
use crate::ports::ChatRepository;

/// Loads a session or fails with `NotFound`.
pub(crate) async fn load_session(
    repository: &dyn ChatRepository,
    key: &SessionKey,
) -> Result<ChatSession, ChatError> {
    repository
        .find_by_key(key)
        .await?
        .ok_or_else(|| ChatError::not_found(key.clone()))
}

/// Loads a session the caller is allowed to access.
pub(crate) async fn load_authorized(
    repository: &dyn ChatRepository,
    key: &SessionKey,
    caller: Option<&AuthenticatedUser>,
) -> Result<ChatSession, ChatError> {
    let session = load_session(repository, key).await?;
    session.authorize(caller)?;
    Ok(session)
}

/// The caller, if they hold an agent role.
pub(crate) fn require_agent(
    caller: Option<&AuthenticatedUser>,
) -> Result<&AuthenticatedUser, ChatError> {
    match caller {
        Some(user) if user.is_agent() => Ok(user),
        _ => Err(ChatError::forbidden("agent role required")),
    }
}

/// The viewer side a caller may act as.
pub(crate) fn viewer_for(
    caller: Option<&AuthenticatedUser>,
    as_agent: bool,
) -> Result<Viewer, ChatError> {
    if as_agent {
        require_agent(caller)?;
    }
    Ok(Viewer::from_is_agent(as_agent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;

    #[test]
    fn require_agent_rejects_customers_and_anonymous() {
        let customer = AuthenticatedUser::customer(UserId::new(1));
        assert!(require_agent(Some(&customer)).is_err());
        assert!(require_agent(None).is_err());

        let agent = AuthenticatedUser::agent(UserId::new(7));
        assert_eq!(require_agent(Some(&agent)).unwrap().id, UserId::new(7));
    }

    #[test]
    fn viewer_for_agent_side_requires_agent() {
        assert_eq!(viewer_for(None, false).unwrap(), Viewer::Visitor);
        assert!(matches!(viewer_for(None, true), Err(ChatError::Forbidden(_))));
    }
}
