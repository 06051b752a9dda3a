//! Errors shared by every layer, and the wire codes they surface as.

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// A value was refused at construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is empty")]
    EmptyField { field: String },

    #[error("{field} is {actual} characters long, the limit is {max}")]
    TooLong {
        field: String,
        max: usize,
        actual: usize,
    },

    #[error("{field} is malformed: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    pub fn empty_field(field: impl Into<String>) -> Self {
        Self::EmptyField { field: field.into() }
    }

    pub fn too_long(field: impl Into<String>, max: usize, actual: usize) -> Self {
        Self::TooLong {
            field: field.into(),
            max,
            actual,
        }
    }

    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn field(&self) -> &str {
        match self {
            Self::EmptyField { field }
            | Self::TooLong { field, .. }
            | Self::InvalidFormat { field, .. } => field,
        }
    }
}

/// Stable machine-readable code carried by API error bodies and client
/// error events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ValidationFailed,
    SessionNotFound,
    InvalidStateTransition,
    SessionEnded,
    Unauthorized,
    Forbidden,
    NotConnected,
    TransportError,
    DatabaseError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        use ErrorCode::*;
        match self {
            ValidationFailed => "VALIDATION_FAILED",
            SessionNotFound => "SESSION_NOT_FOUND",
            InvalidStateTransition => "INVALID_STATE_TRANSITION",
            SessionEnded => "SESSION_ENDED",
            Unauthorized => "UNAUTHORIZED",
            Forbidden => "FORBIDDEN",
            NotConnected => "NOT_CONNECTED",
            TransportError => "TRANSPORT_ERROR",
            DatabaseError => "DATABASE_ERROR",
            InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coded failure from the repository or a state machine.
///
/// `details` holds extra key/value context such as the offending field.
#[derive(Debug, Clone, Error)]
#[error("[{code}] {message}")]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// A storage failure; `context` names the operation.
    pub fn database(context: &str, err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, format!("{context}: {err}"))
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

impl From<ValidationError> for DomainError {
    fn from(err: ValidationError) -> Self {
        let field = err.field().to_owned();
        Self::new(ErrorCode::ValidationFailed, err.to_string()).with_detail("field", field)
    }
}
