//! Chat-specific error types.

use crate::domain::foundation::{DomainError, ErrorCode, SessionKey, ValidationError};

/// Errors raised by chat session operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    /// No session exists for the key.
    NotFound(SessionKey),
    /// The session has ended and accepts no more changes.
    SessionEnded(SessionKey),
    /// Caller is not allowed to perform the operation.
    Forbidden(String),
    /// Operation is not valid in the current state.
    InvalidState(String),
    /// Input failed validation.
    ValidationFailed { field: String, message: String },
    /// Storage or other infrastructure failure.
    Infrastructure(String),
}

impl ChatError {
    pub fn not_found(key: SessionKey) -> Self {
        ChatError::NotFound(key)
    }
    pub fn session_ended(key: SessionKey) -> Self {
        ChatError::SessionEnded(key)
    }
    pub fn forbidden(reason: impl Into<String>) -> Self {
        ChatError::Forbidden(reason.into())
    }
    pub fn invalid_state(message: impl Into<String>) -> Self {
        ChatError::InvalidState(message.into())
    }
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ChatError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }
    pub fn infrastructure(message: impl Into<String>) -> Self {
        ChatError::Infrastructure(message.into())
    }
    pub fn code(&self) -> ErrorCode {
        match self {
            ChatError::NotFound(_) => ErrorCode::SessionNotFound,
            ChatError::SessionEnded(_) => ErrorCode::SessionEnded,
            ChatError::Forbidden(_) => ErrorCode::Forbidden,
            ChatError::InvalidState(_) => ErrorCode::InvalidStateTransition,
            ChatError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            ChatError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }
    pub fn message(&self) -> String {
        match self {
            ChatError::NotFound(key) => format!("Chat session not found: {}", key),
            ChatError::SessionEnded(key) => format!("Chat session has ended: {}", key),
            ChatError::Forbidden(reason) => format!("Permission denied: {}", reason),
            ChatError::InvalidState(msg) => format!("Invalid state: {}", msg),
            ChatError::ValidationFailed { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            ChatError::Infrastructure(msg) => format!("Error: {}", msg),
        }
    }
}

impl std::fmt::Display for ChatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ChatError {}

impl From<ValidationError> for ChatError {
    fn from(err: ValidationError) -> Self {
        ChatError::validation(err.field().to_string(), err.to_string())
    }
}

impl From<DomainError> for ChatError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => {
                let field = err.details.get("field").cloned().unwrap_or_default();
                ChatError::validation(field, err.message)
            }
            ErrorCode::InvalidStateTransition => ChatError::invalid_state(err.message),
            ErrorCode::Forbidden | ErrorCode::Unauthorized => ChatError::forbidden(err.message),
            _ => ChatError::infrastructure(err.to_string()),
        }
    }
}

impl From<ChatError> for DomainError {
    fn from(err: ChatError) -> Self {
        DomainError::new(err.code(), err.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SessionKey {
        SessionKey::new("S1").unwrap()
    }

    #[test]
    fn session_ended_maps_to_session_ended_code() {
        assert_eq!(ChatError::session_ended(key()).code(), ErrorCode::SessionEnded);
    }

    #[test]
    fn not_found_message_includes_key() {
        assert_eq!(
            ChatError::not_found(key()).to_string(),
            "Chat session not found: S1"
        );
    }

    #[test]
    fn validation_error_converts_with_field() {
        let err: ChatError = ValidationError::empty_field("message").into();
        assert!(matches!(err, ChatError::ValidationFailed { ref field, .. } if field == "message"));
    }

    #[test]
    fn database_domain_error_becomes_infrastructure() {
        let err: ChatError = DomainError::new(ErrorCode::DatabaseError, "boom").into();
        assert_eq!(err.code(), ErrorCode::DatabaseError);
    }
}
