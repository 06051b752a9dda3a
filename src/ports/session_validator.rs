//! Port for turning a bearer credential into a chat caller.
//!
//! The storefront's identity provider issues the credentials. The REST auth
//! middleware and the socket upgrade both resolve callers through this port,
//! so an agent is recognised the same way on either path.

use async_trait::async_trait;

use crate::domain::foundation::{AuthError, AuthenticatedUser};

#[async_trait]
pub trait SessionValidator: Send + Sync {
    /// Resolves a raw credential, without its `Bearer ` prefix.
    ///
    /// Refused credentials are `InvalidToken` or `TokenExpired`. A validator
    /// that cannot reach its backing service answers `ServiceUnavailable`,
    /// which callers report as 503 rather than 401.
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError>;
}
