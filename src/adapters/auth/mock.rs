//! Fixed-token validator for tests and local demos.
//!
//! ```ignore
//! let validator = MockSessionValidator::new()
//!     .with_agent("agent-token", 7)
//!     .with_customer("customer-token", 42);
//! ```

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId};
use crate::ports::SessionValidator;

/// Accepts exactly the registered tokens, or fails every call with a
/// configured error.
#[derive(Debug, Default, Clone)]
pub struct MockSessionValidator {
    users: HashMap<String, AuthenticatedUser>,
    outage: Option<AuthError>,
}

impl MockSessionValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, token: impl Into<String>, user: AuthenticatedUser) -> Self {
        self.users.insert(token.into(), user);
        self
    }

    pub fn with_customer(self, token: impl Into<String>, user_id: i64) -> Self {
        self.with_user(token, AuthenticatedUser::customer(UserId::new(user_id)))
    }

    pub fn with_agent(self, token: impl Into<String>, user_id: i64) -> Self {
        self.with_user(token, AuthenticatedUser::agent(UserId::new(user_id)))
    }

    /// Every validation fails with `error`, registered tokens included.
    pub fn with_error(mut self, error: AuthError) -> Self {
        self.outage = Some(error);
        self
    }
}

#[async_trait]
impl SessionValidator for MockSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        if let Some(error) = &self.outage {
            return Err(error.clone());
        }
        self.users.get(token).cloned().ok_or(AuthError::InvalidToken)
    }
}
