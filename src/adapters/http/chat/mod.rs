//! HTTP adapter for chat endpoints.
//!
//! Exposes the chat broker via REST API:
//! - `POST /api/chat/sessions` - Resume or start a session
//! - `GET /api/chat/sessions` - Agent dashboard listing
//! - `GET /api/chat/sessions/:key` - Session details
//! - `GET|POST /api/chat/sessions/:key/messages` - Polling resource and posting
//! - `POST /api/chat/sessions/:key/assign` - Agent assignment
//! - `POST /api/chat/sessions/:key/end` - End the session
//! - `POST /api/chat/sessions/:key/read` - Read receipts
//! - `GET /api/chat/sessions/:key/unread` - Unread count

pub mod dto;
pub mod handlers;
pub mod routes;

pub use dto::*;
pub use handlers::{health, ChatApiError, ChatAppState};
pub use routes::{chat_router, chat_routes};
