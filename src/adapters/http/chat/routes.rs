//! Axum router configuration for chat endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{
    assign_agent, create_session, end_session, get_session, list_messages, list_sessions,
    mark_read, post_message, unread_count, ChatAppState,
};

/// Create the chat API router, mounted at `/api/chat`.
///
/// # Routes
///
/// ## Visitor and agent endpoints (bearer optional for anonymous sessions)
/// - `POST /sessions` - Resume or start the caller's session
/// - `GET /sessions/:key` - Session details
/// - `GET /sessions/:key/messages?since_id=` - Messages after an id (polling)
/// - `POST /sessions/:key/messages` - Post a message
/// - `POST /sessions/:key/end` - End the session
/// - `POST /sessions/:key/read` - Mark incoming messages read
/// - `GET /sessions/:key/unread?as_agent=` - Unread count
///
/// ## Agent endpoints
/// - `GET /sessions?include_ended=` - Dashboard listing
/// - `POST /sessions/:key/assign` - Assign or transfer
pub fn chat_routes() -> Router<ChatAppState> {
    Router::new()
        .route("/sessions", post(create_session).get(list_sessions))
        .route("/sessions/:key", get(get_session))
        .route(
            "/sessions/:key/messages",
            get(list_messages).post(post_message),
        )
        .route("/sessions/:key/assign", post(assign_agent))
        .route("/sessions/:key/end", post(end_session))
        .route("/sessions/:key/read", post(mark_read))
        .route("/sessions/:key/unread", get(unread_count))
}

/// Create the complete chat module router.
///
/// # Example
///
/// ```ignore
/// let app = Router::new()
///     .nest("/api", chat_router())
///     .with_state(ChatAppState::new(broker));
/// ```
pub fn chat_router() -> Router<ChatAppState> {
    Router::new().nest("/chat", chat_routes())
}
