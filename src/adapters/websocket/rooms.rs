//! Chat rooms: fan-out of server frames to every socket attached to a session.
//!
//! ```text
//! Room: 3f2a…        Room: 9c1e…
//! ├── visitor tab    ├── visitor tab
//! ├── agent          └── admin observer
//! └── admin observer
//! ```
//!
//! A message posted to a session reaches every socket in its room, the
//! sender's own socket included so it can reconcile its optimistic copy.
//! Presence and typing frames skip the socket they came from.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::domain::chat::{ChatMessage, ServerFrame};
use crate::domain::foundation::SessionKey;
use crate::ports::SessionNotifier;

/// Unique identifier for a socket connection.
///
/// Generated server-side when a client connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Create a new random client ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A frame broadcast into a room.
#[derive(Debug, Clone)]
pub struct RoomFrame {
    /// Socket that caused the frame; it does not get the frame back.
    pub origin: Option<ClientId>,
    pub frame: ServerFrame,
}

impl RoomFrame {
    /// Returns true if `client` should receive this frame.
    pub fn is_for(&self, client: &ClientId) -> bool {
        self.origin.as_ref() != Some(client)
    }
}

/// Manages chat rooms keyed by session key.
///
/// Uses `RwLock` for the room registry since broadcasts (reads) vastly
/// outnumber joins and leaves (writes).
pub struct RoomManager {
    /// session_key → broadcast sender for that room.
    rooms: RwLock<HashMap<SessionKey, broadcast::Sender<RoomFrame>>>,

    /// client_id → session_key for O(1) cleanup on disconnect.
    client_sessions: RwLock<HashMap<ClientId, SessionKey>>,

    /// Buffer size of each room. A socket that falls further behind is
    /// dropped and recovers the backlog on reconnect.
    channel_capacity: usize,
}

impl RoomManager {
    pub fn new(channel_capacity: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            client_sessions: RwLock::new(HashMap::new()),
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Create with default capacity (128 frames).
    pub fn with_default_capacity() -> Self {
        Self::new(128)
    }

    /// Join a client to a session room, creating the room if needed.
    pub async fn join(
        &self,
        session_key: &SessionKey,
        client_id: ClientId,
    ) -> broadcast::Receiver<RoomFrame> {
        let mut rooms = self.rooms.write().await;

        let sender = rooms.entry(session_key.clone()).or_insert_with(|| {
            let (tx, _) = broadcast::channel(self.channel_capacity);
            tx
        });

        self.client_sessions
            .write()
            .await
            .insert(client_id, session_key.clone());

        sender.subscribe()
    }

    /// Remove a client from its room. Empty rooms are dropped.
    ///
    /// The client's receiver must already be dropped for its room to count
    /// as empty.
    pub async fn leave(&self, client_id: &ClientId) -> Option<SessionKey> {
        let session_key = self.client_sessions.write().await.remove(client_id)?;

        let mut rooms = self.rooms.write().await;
        if rooms
            .get(&session_key)
            .map(|sender| sender.receiver_count() == 0)
            .unwrap_or(false)
        {
            rooms.remove(&session_key);
        }
        Some(session_key)
    }

    /// Broadcast a frame to every client in a session room.
    ///
    /// No-op if nobody is attached.
    pub async fn broadcast(&self, session_key: &SessionKey, frame: RoomFrame) {
        let rooms = self.rooms.read().await;

        if let Some(sender) = rooms.get(session_key) {
            // No receivers is fine.
            let _ = sender.send(frame);
        }
    }

    /// Number of sockets attached to a session.
    pub async fn client_count(&self, session_key: &SessionKey) -> usize {
        self.rooms
            .read()
            .await
            .get(session_key)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    /// Keys of all sessions with a room.
    pub async fn active_rooms(&self) -> Vec<SessionKey> {
        self.rooms.read().await.keys().cloned().collect()
    }

    /// Total sockets across all rooms.
    pub async fn total_client_count(&self) -> usize {
        self.client_sessions.read().await.len()
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

#[async_trait]
impl SessionNotifier for RoomManager {
    async fn message_posted(&self, session_key: &SessionKey, message: &ChatMessage) {
        self.broadcast(
            session_key,
            RoomFrame {
                origin: None,
                frame: ServerFrame::NewMessage {
                    message: message.clone(),
                },
            },
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chat::NewChatMessage;
    use crate::domain::foundation::{ChatSessionId, MessageId, Timestamp};
    use std::sync::Arc;

    fn key(s: &str) -> SessionKey {
        SessionKey::new(s).unwrap()
    }

    fn typing_from(origin: ClientId) -> RoomFrame {
        RoomFrame {
            origin: Some(origin),
            frame: ServerFrame::TypingStatus {
                user_id: None,
                is_agent: false,
                is_typing: true,
            },
        }
    }

    #[tokio::test]
    async fn join_creates_room_if_not_exists() {
        let manager = RoomManager::with_default_capacity();
        let _rx = manager.join(&key("S1"), ClientId::new()).await;
        assert_eq!(manager.active_rooms().await, vec![key("S1")]);
    }

    #[tokio::test]
    async fn posted_messages_reach_every_client_in_room() {
        let manager = Arc::new(RoomManager::with_default_capacity());
        let mut rx1 = manager.join(&key("S1"), ClientId::new()).await;
        let mut rx2 = manager.join(&key("S1"), ClientId::new()).await;
        let mut other = manager.join(&key("S2"), ClientId::new()).await;

        let message = NewChatMessage::system("hello").into_message(
            MessageId::first(),
            ChatSessionId::new(1),
            Timestamp::now(),
        );
        manager.message_posted(&key("S1"), &message).await;

        for rx in [&mut rx1, &mut rx2] {
            let received = rx.recv().await.unwrap();
            assert_eq!(
                received.frame,
                ServerFrame::NewMessage {
                    message: message.clone()
                }
            );
        }
        assert!(other.try_recv().is_err());
    }

    #[test]
    fn frames_skip_their_origin() {
        let me = ClientId::new();
        let you = ClientId::new();
        let frame = typing_from(me);
        assert!(!frame.is_for(&me));
        assert!(frame.is_for(&you));
    }

    #[tokio::test]
    async fn leave_returns_session_and_cleans_up_empty_room() {
        let manager = RoomManager::with_default_capacity();
        let client_id = ClientId::new();
        {
            let _rx = manager.join(&key("S1"), client_id).await;
        }

        assert_eq!(manager.leave(&client_id).await, Some(key("S1")));
        assert!(manager.active_rooms().await.is_empty());
        assert_eq!(manager.total_client_count().await, 0);
    }

    #[tokio::test]
    async fn leave_keeps_room_with_remaining_clients() {
        let manager = RoomManager::with_default_capacity();
        let leaving = ClientId::new();
        let _staying = manager.join(&key("S1"), ClientId::new()).await;
        {
            let _rx = manager.join(&key("S1"), leaving).await;
        }

        manager.leave(&leaving).await;
        assert_eq!(manager.client_count(&key("S1")).await, 1);
    }

    #[tokio::test]
    async fn broadcast_to_nonexistent_room_is_noop() {
        let manager = RoomManager::with_default_capacity();
        manager.broadcast(&key("S1"), typing_from(ClientId::new())).await;
        assert_eq!(manager.client_count(&key("S1")).await, 0);
    }
}
