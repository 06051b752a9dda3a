//! Fan-out port for attached session listeners.

use async_trait::async_trait;

use crate::domain::chat::ChatMessage;
use crate::domain::foundation::SessionKey;

/// Delivers broker-side changes to every listener attached to a session.
///
/// Delivery is best effort. A session without attached listeners is not an
/// error; those parties pick the message up on their next poll.
#[async_trait]
pub trait SessionNotifier: Send + Sync {
    /// A message was appended to the session.
    ///
    /// Called while the session's write lock is held, so calls for one
    /// session arrive in message id order.
    async fn message_posted(&self, session_key: &SessionKey, message: &ChatMessage);
}
