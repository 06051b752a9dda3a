//! HTTP adapters - REST API implementations.
//!
//! - [`chat`] - Chat session and message endpoints
//! - [`middleware`] - Bearer authentication
//! - [`app`] - Router assembly for the broker binary

pub mod app;
pub mod chat;
pub mod middleware;

pub use app::{app_router, ChatServices};
pub use chat::{chat_router, ChatApiError, ChatAppState};
