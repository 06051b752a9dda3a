//! HTTP handlers for chat endpoints.
//!
//! These handlers connect Axum routes to the chat broker.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::application::handlers::chat::{
    AssignAgentCommand, ChatBroker, CreateOrJoinSessionCommand, EndSessionCommand,
    GetSessionQuery, ListMessagesQuery, ListSessionsQuery, MarkReadCommand, PostMessageCommand,
    UnreadCountQuery,
};
use crate::domain::chat::{ChatError, SenderType};
use crate::domain::foundation::{SessionKey, ValidationError};

use crate::adapters::http::middleware::{OptionalAuth, RequireAuth};

use super::dto::{
    AssignAgentRequest, AssignAgentResponse, ErrorResponse, MarkReadRequest, MarkReadResponse,
    MessagesParams, PostMessageRequest, SessionsParams, UnreadParams, UnreadResponse,
};

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state of the chat routes.
#[derive(Clone)]
pub struct ChatAppState {
    pub broker: Arc<ChatBroker>,
}

impl ChatAppState {
    pub fn new(broker: Arc<ChatBroker>) -> Self {
        Self { broker }
    }
}

fn session_key(raw: String) -> Result<SessionKey, ChatApiError> {
    Ok(SessionKey::new(raw)?)
}

fn client_addr(connect_info: Option<ConnectInfo<SocketAddr>>) -> String {
    connect_info
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

// ════════════════════════════════════════════════════════════════════════════════
// Sessions
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/chat/sessions - Resume the caller's open session or start one.
///
/// Anonymous visitors are identified by their address.
pub async fn create_session(
    State(state): State<ChatAppState>,
    OptionalAuth(caller): OptionalAuth,
    connect_info: Option<ConnectInfo<SocketAddr>>,
) -> Result<impl IntoResponse, ChatApiError> {
    let result = state
        .broker
        .create_or_join_session(CreateOrJoinSessionCommand {
            caller,
            client_addr: client_addr(connect_info),
        })
        .await?;

    let status = if result.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(result.session)))
}

/// GET /api/chat/sessions - Agent dashboard listing.
pub async fn list_sessions(
    State(state): State<ChatAppState>,
    RequireAuth(caller): RequireAuth,
    Query(params): Query<SessionsParams>,
) -> Result<impl IntoResponse, ChatApiError> {
    let sessions = state
        .broker
        .list_sessions(ListSessionsQuery {
            include_ended: params.include_ended,
            caller: Some(caller),
        })
        .await?;
    Ok(Json(sessions))
}

/// GET /api/chat/sessions/:key
pub async fn get_session(
    State(state): State<ChatAppState>,
    OptionalAuth(caller): OptionalAuth,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ChatApiError> {
    let session = state
        .broker
        .get_session(GetSessionQuery {
            session_key: session_key(key)?,
            caller,
        })
        .await?;
    Ok(Json(session))
}

/// POST /api/chat/sessions/:key/assign - Assign or transfer to an agent.
pub async fn assign_agent(
    State(state): State<ChatAppState>,
    RequireAuth(caller): RequireAuth,
    Path(key): Path<String>,
    Json(request): Json<AssignAgentRequest>,
) -> Result<impl IntoResponse, ChatApiError> {
    let result = state
        .broker
        .assign_agent(AssignAgentCommand {
            session_key: session_key(key)?,
            agent_id: request.agent_id,
            caller: Some(caller),
        })
        .await?;
    Ok(Json(AssignAgentResponse::new(
        result.session,
        result.assignment,
        result.notice,
    )))
}

/// POST /api/chat/sessions/:key/end
pub async fn end_session(
    State(state): State<ChatAppState>,
    OptionalAuth(caller): OptionalAuth,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ChatApiError> {
    let session = state
        .broker
        .end_session(EndSessionCommand {
            session_key: session_key(key)?,
            caller,
        })
        .await?;
    Ok(Json(session))
}

// ════════════════════════════════════════════════════════════════════════════════
// Messages
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/chat/sessions/:key/messages?since_id= - The polling resource.
pub async fn list_messages(
    State(state): State<ChatAppState>,
    OptionalAuth(caller): OptionalAuth,
    Path(key): Path<String>,
    Query(params): Query<MessagesParams>,
) -> Result<impl IntoResponse, ChatApiError> {
    let messages = state
        .broker
        .list_messages(ListMessagesQuery {
            session_key: session_key(key)?,
            since_id: params.since_id,
            caller,
        })
        .await?;
    Ok(Json(messages))
}

/// POST /api/chat/sessions/:key/messages
pub async fn post_message(
    State(state): State<ChatAppState>,
    OptionalAuth(caller): OptionalAuth,
    Path(key): Path<String>,
    Json(request): Json<PostMessageRequest>,
) -> Result<impl IntoResponse, ChatApiError> {
    let message = state
        .broker
        .post_message(PostMessageCommand {
            session_key: session_key(key)?,
            body: request.message,
            sender_type: SenderType::from_is_agent(request.is_agent),
            sender_id: request.sender_id,
            client_message_id: request.client_message_id,
            caller,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// POST /api/chat/sessions/:key/read
pub async fn mark_read(
    State(state): State<ChatAppState>,
    OptionalAuth(caller): OptionalAuth,
    Path(key): Path<String>,
    Json(request): Json<MarkReadRequest>,
) -> Result<impl IntoResponse, ChatApiError> {
    let marked = state
        .broker
        .mark_read(MarkReadCommand {
            session_key: session_key(key)?,
            as_agent: request.as_agent,
            up_to: request.up_to_id,
            caller,
        })
        .await?;
    Ok(Json(MarkReadResponse { marked }))
}

/// GET /api/chat/sessions/:key/unread?as_agent=
pub async fn unread_count(
    State(state): State<ChatAppState>,
    OptionalAuth(caller): OptionalAuth,
    Path(key): Path<String>,
    Query(params): Query<UnreadParams>,
) -> Result<impl IntoResponse, ChatApiError> {
    let unread = state
        .broker
        .unread_count(UnreadCountQuery {
            session_key: session_key(key)?,
            as_agent: params.as_agent,
            caller,
        })
        .await?;
    Ok(Json(UnreadResponse { unread }))
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error wrapper that converts chat errors to HTTP responses.
#[derive(Debug)]
pub struct ChatApiError(ChatError);

impl From<ChatError> for ChatApiError {
    fn from(err: ChatError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for ChatApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl ChatApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            ChatError::NotFound(_) => StatusCode::NOT_FOUND,
            ChatError::SessionEnded(_) | ChatError::InvalidState(_) => StatusCode::CONFLICT,
            ChatError::Forbidden(_) => StatusCode::FORBIDDEN,
            ChatError::ValidationFailed { .. } => StatusCode::BAD_REQUEST,
            ChatError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ChatApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "chat request failed");
        }
        let body = ErrorResponse::new(self.0.code().as_str(), self.0.message());
        (status, Json(body)).into_response()
    }
}
