//! Foundation module - Shared domain primitives.
//!
//! Contains value objects, identifiers, errors and the state machine trait
//! that form the vocabulary of the chat domain.

mod auth;
mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use auth::{AuthError, AuthenticatedUser, UserRole};
pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{
    ChatSessionId, ClientMessageId, MessageId, SessionKey, UserId, MAX_SESSION_KEY_LENGTH,
};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
