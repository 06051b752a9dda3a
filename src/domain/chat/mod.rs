//! Chat domain - sessions, messages and their lifecycle.
//!
//! # Key Types
//!
//! - `ChatSession` - Aggregate owning status, assignment and message sequence
//! - `ChatMessage` - Authoritative, broker-numbered message
//! - `ChatSessionStatus` - `active -> transferred -> ended` lifecycle
//! - `Visitor` / `Viewer` - Who opened the session, and whose side is reading
//! - `ClientFrame` / `ServerFrame` - Persistent-channel wire protocol

mod errors;
mod frames;
mod message;
mod session;
mod status;
mod visitor;

pub use errors::ChatError;
pub use frames::{ClientFrame, ServerFrame};
pub use message::{
    ChatMessage, MessageBody, NewChatMessage, SenderType, DEFAULT_MAX_MESSAGE_LENGTH,
};
pub use session::{AgentAssignment, ChatSession, ChatSessionSummary};
pub use status::ChatSessionStatus;
pub use visitor::{Viewer, Visitor};
