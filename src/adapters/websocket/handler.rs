//! WebSocket upgrade handler for the persistent chat channel.
//!
//! Handles the HTTP → WebSocket upgrade and manages the connection lifecycle:
//! 1. Validate the optional `?token=` credential before upgrading
//! 2. Wait for a `join_session` frame and authorize it
//! 3. Join the session room, then send the backlog
//! 4. Relay chat and typing frames until disconnect
//! 5. Announce departure and clean up room membership

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures::{stream::SplitSink, SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};

use crate::application::handlers::chat::{
    ChatBroker, GetSessionQuery, ListMessagesQuery, PostMessageCommand,
};
use crate::domain::chat::{ChatError, ClientFrame, SenderType, ServerFrame};
use crate::domain::foundation::{AuthenticatedUser, ErrorCode, MessageId, SessionKey, UserId};
use crate::ports::SessionValidator;

use super::rooms::{ClientId, RoomFrame, RoomManager};

/// State required for WebSocket handling.
#[derive(Clone)]
pub struct ChatWsState {
    pub broker: Arc<ChatBroker>,
    pub rooms: Arc<RoomManager>,
    pub validator: Arc<dyn SessionValidator>,
}

impl ChatWsState {
    pub fn new(
        broker: Arc<ChatBroker>,
        rooms: Arc<RoomManager>,
        validator: Arc<dyn SessionValidator>,
    ) -> Self {
        Self {
            broker,
            rooms,
            validator,
        }
    }
}

/// Query string of the upgrade request.
#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    #[serde(default)]
    pub token: Option<String>,
}

/// Handle WebSocket upgrade requests for chat sessions.
///
/// Route: `GET /ws/chat?token=<bearer>`
///
/// The token is optional; without one the socket can only join anonymous
/// sessions. A token that fails validation is rejected with 401 before the
/// upgrade.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<ChatWsState>,
) -> Response {
    let caller = match params.token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => match state.validator.validate(token).await {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::debug!(error = %e, "socket credential rejected");
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(serde_json::json!({
                        "code": ErrorCode::Unauthorized.as_str(),
                        "message": e.to_string(),
                    })),
                )
                    .into_response();
            }
        },
        None => None,
    };

    ws.on_upgrade(move |socket| handle_socket(socket, caller, state))
}

/// Identity a socket presents inside its room.
#[derive(Debug, Clone, Copy)]
struct Party {
    user_id: Option<UserId>,
    is_agent: bool,
}

/// A socket attached to a session room.
struct Joined {
    session_key: SessionKey,
    party: Party,
    room_rx: broadcast::Receiver<RoomFrame>,
    /// Highest id already delivered in the backlog.
    backlog_last: Option<MessageId>,
}

type SocketSink = SplitSink<WebSocket, Message>;

/// Handle an established WebSocket connection.
async fn handle_socket(socket: WebSocket, caller: Option<AuthenticatedUser>, state: ChatWsState) {
    let (mut sender, mut receiver) = socket.split();
    let client_id = ClientId::new();

    tracing::debug!(client_id = %client_id, authenticated = caller.is_some(), "chat socket opened");

    // Nothing but join_session is accepted until the socket is in a room.
    let joined = loop {
        let text = match receiver.next().await {
            Some(Ok(Message::Text(text))) => text,
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                tracing::debug!(client_id = %client_id, "chat socket closed before join");
                return;
            }
            Some(Ok(_)) => continue,
        };

        let reply = match serde_json::from_str::<ClientFrame>(&text) {
            Ok(ClientFrame::JoinSession {
                session_id,
                user_id,
                is_agent,
            }) => {
                match join(&state, client_id, caller.as_ref(), session_id, user_id, is_agent).await
                {
                    Ok((joined, frame)) => {
                        if send_frame(&mut sender, &frame).await.is_err() {
                            drop(joined);
                            state.rooms.leave(&client_id).await;
                            return;
                        }
                        break joined;
                    }
                    Err(err) => ServerFrame::error(&err),
                }
            }
            Ok(_) => ServerFrame::error(&ChatError::invalid_state("join a session first")),
            Err(e) => ServerFrame::error(&ChatError::validation("frame", e.to_string())),
        };

        if send_frame(&mut sender, &reply).await.is_err() {
            return;
        }
    };

    let Joined {
        session_key,
        party,
        room_rx,
        backlog_last,
    } = joined;

    state
        .rooms
        .broadcast(
            &session_key,
            RoomFrame {
                origin: Some(client_id),
                frame: ServerFrame::UserJoined {
                    user_id: party.user_id,
                    is_agent: party.is_agent,
                },
            },
        )
        .await;

    // Frames for this socket only, such as rejections of its own messages.
    let (direct_tx, direct_rx) = mpsc::unbounded_channel::<ServerFrame>();

    let mut send_task = tokio::spawn(forward_frames(
        sender,
        room_rx,
        direct_rx,
        client_id,
        backlog_last,
    ));

    let recv_state = state.clone();
    let recv_key = session_key.clone();
    let recv_caller = caller.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(result) = receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    let frame = match serde_json::from_str::<ClientFrame>(&text) {
                        Ok(frame) => frame,
                        Err(e) => {
                            let err = ChatError::validation("frame", e.to_string());
                            let _ = direct_tx.send(ServerFrame::error(&err));
                            continue;
                        }
                    };
                    if let Some(reply) = handle_frame(
                        &recv_state,
                        client_id,
                        &recv_key,
                        party,
                        recv_caller.as_ref(),
                        frame,
                    )
                    .await
                    {
                        let _ = direct_tx.send(reply);
                    }
                }
                Ok(Message::Binary(_)) => {
                    tracing::warn!(client_id = %client_id, "Received unsupported binary message");
                }
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {
                    // Protocol-level keepalive, answered by axum
                }
                Ok(Message::Close(_)) => {
                    tracing::debug!(client_id = %client_id, "Client sent close frame");
                    break;
                }
                Err(e) => {
                    tracing::debug!(client_id = %client_id, "Receive error: {}", e);
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
            let _ = recv_task.await;
        }
        _ = &mut recv_task => {
            send_task.abort();
            let _ = send_task.await;
        }
    }

    state
        .rooms
        .broadcast(
            &session_key,
            RoomFrame {
                origin: Some(client_id),
                frame: ServerFrame::UserLeft {
                    user_id: party.user_id,
                    is_agent: party.is_agent,
                },
            },
        )
        .await;
    state.rooms.leave(&client_id).await;

    tracing::debug!(client_id = %client_id, session_key = %session_key, "chat socket closed");
}

/// Authorizes a join request and attaches the socket to the room.
///
/// The room is joined before the backlog is read so no message posted in
/// between is lost; duplicates are filtered by id in `forward_frames`.
async fn join(
    state: &ChatWsState,
    client_id: ClientId,
    caller: Option<&AuthenticatedUser>,
    session_key: SessionKey,
    claimed_user: Option<UserId>,
    is_agent: bool,
) -> Result<(Joined, ServerFrame), ChatError> {
    if is_agent && !caller.map(AuthenticatedUser::is_agent).unwrap_or(false) {
        return Err(ChatError::forbidden("agent credentials required"));
    }
    if let Some(claimed) = claimed_user {
        if caller.map(|u| u.id) != Some(claimed) {
            return Err(ChatError::forbidden("user_id does not match credential"));
        }
    }

    let session = state
        .broker
        .get_session(GetSessionQuery {
            session_key: session_key.clone(),
            caller: caller.cloned(),
        })
        .await?;

    let room_rx = state.rooms.join(&session_key, client_id).await;

    let messages = match state
        .broker
        .list_messages(ListMessagesQuery {
            session_key: session_key.clone(),
            since_id: None,
            caller: caller.cloned(),
        })
        .await
    {
        Ok(messages) => messages,
        Err(err) => {
            drop(room_rx);
            state.rooms.leave(&client_id).await;
            return Err(err);
        }
    };

    tracing::info!(
        client_id = %client_id,
        session_key = %session_key,
        is_agent,
        backlog = messages.len(),
        "socket joined chat session"
    );

    let backlog_last = messages.last().map(|m| m.id);
    let party = Party {
        user_id: caller.map(|u| u.id),
        is_agent,
    };

    Ok((
        Joined {
            session_key,
            party,
            room_rx,
            backlog_last,
        },
        ServerFrame::SessionJoined {
            session,
            messages,
            persistent: true,
        },
    ))
}

/// Applies one frame from a joined socket. Returns a frame for this socket
/// only, if any.
async fn handle_frame(
    state: &ChatWsState,
    client_id: ClientId,
    session_key: &SessionKey,
    party: Party,
    caller: Option<&AuthenticatedUser>,
    frame: ClientFrame,
) -> Option<ServerFrame> {
    match frame {
        ClientFrame::Chat {
            message,
            is_agent,
            sender_id,
            client_message_id,
        } => {
            let result = state
                .broker
                .post_message(PostMessageCommand {
                    session_key: session_key.clone(),
                    body: message,
                    sender_type: SenderType::from_is_agent(is_agent),
                    sender_id,
                    client_message_id,
                    caller: caller.cloned(),
                })
                .await;
            // Accepted messages come back through the room like everyone else's.
            match result {
                Ok(_) => None,
                Err(err) => {
                    tracing::debug!(client_id = %client_id, error = %err, "socket message rejected");
                    Some(ServerFrame::error(&err))
                }
            }
        }
        ClientFrame::Typing { is_typing } => {
            state
                .rooms
                .broadcast(
                    session_key,
                    RoomFrame {
                        origin: Some(client_id),
                        frame: ServerFrame::TypingStatus {
                            user_id: party.user_id,
                            is_agent: party.is_agent,
                            is_typing,
                        },
                    },
                )
                .await;
            None
        }
        ClientFrame::JoinSession { .. } => Some(ServerFrame::error(&ChatError::invalid_state(
            "socket already joined a session",
        ))),
    }
}

/// Writes room and direct frames to the socket until either side closes.
///
/// A socket that lags behind its room is closed; the client recovers the
/// backlog when it rejoins.
async fn forward_frames(
    mut sender: SocketSink,
    mut room_rx: broadcast::Receiver<RoomFrame>,
    mut direct_rx: mpsc::UnboundedReceiver<ServerFrame>,
    client_id: ClientId,
    backlog_last: Option<MessageId>,
) {
    loop {
        let frame = tokio::select! {
            direct = direct_rx.recv() => match direct {
                Some(frame) => frame,
                None => break,
            },
            room = room_rx.recv() => match room {
                Ok(room_frame) => {
                    if !room_frame.is_for(&client_id) {
                        continue;
                    }
                    if let ServerFrame::NewMessage { message } = &room_frame.frame {
                        if backlog_last.map_or(false, |last| message.id <= last) {
                            continue;
                        }
                    }
                    room_frame.frame
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(client_id = %client_id, skipped, "socket lagged behind room, closing");
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        };

        if let Err(e) = send_frame(&mut sender, &frame).await {
            tracing::debug!(client_id = %client_id, "Send error, closing connection: {}", e);
            break;
        }
    }
}

/// Send a JSON frame over the WebSocket.
async fn send_frame(sender: &mut SocketSink, frame: &ServerFrame) -> Result<(), axum::Error> {
    let json = serde_json::to_string(frame).map_err(axum::Error::new)?;
    sender.send(Message::Text(json)).await
}

/// Create axum router for the chat socket endpoint.
pub fn websocket_router() -> axum::Router<ChatWsState> {
    use axum::routing::get;

    axum::Router::new().route("/ws/chat", get(ws_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::auth::MockSessionValidator;
    use crate::adapters::memory::InMemoryChatRepository;
    use crate::application::handlers::chat::{ChatPolicy, CreateOrJoinSessionCommand};

    fn state(validator: MockSessionValidator) -> ChatWsState {
        let rooms = Arc::new(RoomManager::default());
        let broker = Arc::new(ChatBroker::new(
            Arc::new(InMemoryChatRepository::new()),
            rooms.clone(),
            ChatPolicy::default(),
        ));
        ChatWsState::new(broker, rooms, Arc::new(validator))
    }

    async fn open_session(state: &ChatWsState, caller: Option<AuthenticatedUser>) -> SessionKey {
        state
            .broker
            .create_or_join_session(CreateOrJoinSessionCommand {
                caller,
                client_addr: "10.0.0.9".to_string(),
            })
            .await
            .unwrap()
            .session
            .session_key()
            .clone()
    }

    #[tokio::test]
    async fn join_sends_backlog_and_tracks_last_id() {
        let state = state(MockSessionValidator::new());
        let customer = AuthenticatedUser::customer(UserId::new(42));
        let key = open_session(&state, Some(customer.clone())).await;
        state
            .broker
            .post_message(PostMessageCommand {
                session_key: key.clone(),
                body: "hello".to_string(),
                sender_type: SenderType::User,
                sender_id: None,
                client_message_id: None,
                caller: Some(customer.clone()),
            })
            .await
            .unwrap();

        let client = ClientId::new();
        let (joined, frame) = join(&state, client, Some(&customer), key.clone(), None, false)
            .await
            .unwrap();

        assert_eq!(joined.backlog_last, Some(MessageId::first()));
        assert_eq!(state.rooms.client_count(&key).await, 1);
        match frame {
            ServerFrame::SessionJoined {
                messages,
                persistent,
                ..
            } => {
                assert!(persistent);
                assert_eq!(messages.len(), 1);
            }
            other => panic!("unexpected frame {:?}", other),
        }
    }

    #[tokio::test]
    async fn join_as_agent_requires_agent_credential() {
        let state = state(MockSessionValidator::new());
        let key = open_session(&state, None).await;

        let err = join(&state, ClientId::new(), None, key, None, true)
            .await
            .err()
            .unwrap();

        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn join_rejects_claimed_user_that_differs_from_credential() {
        let state = state(MockSessionValidator::new());
        let customer = AuthenticatedUser::customer(UserId::new(42));
        let key = open_session(&state, Some(customer.clone())).await;

        let err = join(
            &state,
            ClientId::new(),
            Some(&customer),
            key,
            Some(UserId::new(43)),
            false,
        )
        .await
        .err()
        .unwrap();

        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn join_of_foreign_session_leaves_no_room_behind() {
        let state = state(MockSessionValidator::new());
        let owner = AuthenticatedUser::customer(UserId::new(42));
        let key = open_session(&state, Some(owner)).await;
        let stranger = AuthenticatedUser::customer(UserId::new(7));

        let result = join(&state, ClientId::new(), Some(&stranger), key.clone(), None, false).await;

        assert!(result.is_err());
        assert_eq!(state.rooms.client_count(&key).await, 0);
    }

    #[tokio::test]
    async fn rejected_chat_frame_replies_to_sender_only() {
        let state = state(MockSessionValidator::new());
        let key = open_session(&state, None).await;
        let party = Party {
            user_id: None,
            is_agent: false,
        };

        let reply = handle_frame(
            &state,
            ClientId::new(),
            &key,
            party,
            None,
            ClientFrame::Chat {
                message: "   ".to_string(),
                is_agent: false,
                sender_id: None,
                client_message_id: None,
            },
        )
        .await;

        assert!(matches!(reply, Some(ServerFrame::Error { ref code, .. }) if code == "VALIDATION_FAILED"));
    }

    #[tokio::test]
    async fn typing_is_broadcast_to_others() {
        let state = state(MockSessionValidator::new());
        let key = open_session(&state, None).await;
        let typist = ClientId::new();
        let watcher = ClientId::new();
        let _typist_rx = state.rooms.join(&key, typist).await;
        let mut watcher_rx = state.rooms.join(&key, watcher).await;

        let reply = handle_frame(
            &state,
            typist,
            &key,
            Party {
                user_id: None,
                is_agent: false,
            },
            None,
            ClientFrame::Typing { is_typing: true },
        )
        .await;

        assert!(reply.is_none());
        let received = watcher_rx.recv().await.unwrap();
        assert!(received.is_for(&watcher));
        assert!(!received.is_for(&typist));
        assert!(matches!(
            received.frame,
            ServerFrame::TypingStatus { is_typing: true, .. }
        ));
    }
}
