//! Bearer authentication for the chat API.
//!
//! `auth_middleware` resolves an `Authorization: Bearer` header through the
//! `SessionValidator` port and stores the caller in the request extensions.
//! Requests without the header pass through as anonymous visitors. A header
//! that fails validation is answered with 401 before any handler runs.
//!
//! ```text
//! Request → auth_middleware ─→ extensions: AuthenticatedUser
//!                                   ↓
//!           handler(RequireAuth | OptionalAuth)
//! ```

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::adapters::http::chat::ErrorResponse;
use crate::domain::foundation::{AuthError, AuthenticatedUser, ErrorCode};
use crate::ports::SessionValidator;

/// State of the auth layer.
pub type AuthState = Arc<dyn SessionValidator>;

/// The bearer credential of a request, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

pub async fn auth_middleware(
    State(validator): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()).map(str::to_owned) else {
        return next.run(request).await;
    };

    match validator.validate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => {
            tracing::debug!(error = %e, path = %request.uri().path(), "bearer token rejected");
            AuthRejection::Invalid(e).into_response()
        }
    }
}

/// The authenticated caller. Rejects anonymous requests with 401.
#[derive(Debug, Clone)]
pub struct RequireAuth(pub AuthenticatedUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(RequireAuth)
            .ok_or(AuthRejection::Missing)
    }
}

/// The caller, or `None` for an anonymous visitor.
#[derive(Debug, Clone)]
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(parts.extensions.get::<AuthenticatedUser>().cloned()))
    }
}

/// Why a request was not authenticated.
#[derive(Debug, Clone)]
pub enum AuthRejection {
    /// The route needs a caller and none was presented.
    Missing,
    /// A credential was presented and refused.
    Invalid(AuthError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AuthRejection::Missing => (
                StatusCode::UNAUTHORIZED,
                ErrorCode::Unauthorized,
                "Authentication required",
            ),
            AuthRejection::Invalid(AuthError::TokenExpired) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized, "Token expired")
            }
            AuthRejection::Invalid(AuthError::ServiceUnavailable(reason)) => {
                tracing::error!(reason = %reason, "credential validation unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorCode::InternalError,
                    "Authentication service unavailable",
                )
            }
            AuthRejection::Invalid(_) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::Unauthorized, "Invalid token")
            }
        };

        (status, Json(ErrorResponse::new(code.as_str(), message))).into_response()
    }
}
