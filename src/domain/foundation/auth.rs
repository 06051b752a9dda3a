//! Caller identity as resolved from a storefront credential.
//!
//! Anonymous visitors have no identity at all; they appear as
//! `Option<AuthenticatedUser>::None` wherever a caller is passed.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    Customer,
    Agent,
    /// Store staff; answers chats with agent rights.
    Admin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub display_name: Option<String>,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn new(id: UserId, display_name: Option<String>, role: UserRole) -> Self {
        Self {
            id,
            display_name,
            role,
        }
    }

    pub fn customer(id: UserId) -> Self {
        Self::new(id, None, UserRole::Customer)
    }

    pub fn agent(id: UserId) -> Self {
        Self::new(id, None, UserRole::Agent)
    }

    /// May post agent messages, take assignments and list sessions.
    pub fn is_agent(&self) -> bool {
        self.role != UserRole::Customer
    }
}

/// Why a credential did not yield a caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("credential is malformed or badly signed")]
    InvalidToken,

    #[error("credential has expired")]
    TokenExpired,

    /// The validator could not reach what it validates against.
    #[error("credential validation unavailable: {0}")]
    ServiceUnavailable(String),
}

impl AuthError {
    pub fn service_unavailable(reason: impl Into<String>) -> Self {
        Self::ServiceUnavailable(reason.into())
    }
}
