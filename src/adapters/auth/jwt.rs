//! HS256 JWT adapter for bearer credential validation.
//!
//! The storefront's identity provider signs access tokens with a shared
//! secret. This adapter checks the signature and expiry (and the issuer, when
//! configured) and maps the claims to an `AuthenticatedUser`.
//!
//! # Claims
//!
//! - `sub`: numeric storefront user id
//! - `exp`: expiry, Unix seconds
//! - `role`: `customer` (default), `agent` or `admin`
//! - `name`: optional display name

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AuthError, AuthenticatedUser, UserId, UserRole};
use crate::ports::SessionValidator;

/// Configuration for the JWT validator.
#[derive(Debug)]
pub struct JwtConfig {
    /// Shared HS256 secret.
    pub secret: SecretString,
    /// Expected `iss` claim. Not checked when `None`.
    pub issuer: Option<String>,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: SecretString::new(secret.into()),
            issuer: None,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct StorefrontClaims {
    sub: String,
    exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    iss: Option<String>,
    #[serde(default)]
    role: UserRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

/// `SessionValidator` for HS256-signed storefront tokens.
pub struct JwtSessionValidator {
    config: JwtConfig,
    decoding_key: DecodingKey,
}

impl JwtSessionValidator {
    pub fn new(config: JwtConfig) -> Self {
        let decoding_key = DecodingKey::from_secret(config.secret.expose_secret().as_bytes());
        Self {
            config,
            decoding_key,
        }
    }

    /// Signs a token for `user` valid for `ttl_secs`.
    ///
    /// The identity provider normally issues tokens; this exists for local
    /// development and tests.
    pub fn issue(&self, user: &AuthenticatedUser, ttl_secs: i64) -> Result<String, AuthError> {
        let claims = StorefrontClaims {
            sub: user.id.to_string(),
            exp: Utc::now().timestamp() + ttl_secs,
            iss: self.config.issuer.clone(),
            role: user.role,
            name: user.display_name.clone(),
        };
        let key = EncodingKey::from_secret(self.config.secret.expose_secret().as_bytes());
        encode(&Header::new(Algorithm::HS256), &claims, &key)
            .map_err(|e| AuthError::service_unavailable(format!("token signing failed: {}", e)))
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        match &self.config.issuer {
            Some(issuer) => {
                validation.set_issuer(&[issuer]);
                validation.set_required_spec_claims(&["exp", "sub", "iss"]);
            }
            None => validation.set_required_spec_claims(&["exp", "sub"]),
        }
        validation
    }
}

#[async_trait]
impl SessionValidator for JwtSessionValidator {
    async fn validate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let data = decode::<StorefrontClaims>(token, &self.decoding_key, &self.validation())
            .map_err(|e| {
                use jsonwebtoken::errors::ErrorKind;
                match e.kind() {
                    ErrorKind::ExpiredSignature => {
                        tracing::debug!("Token expired");
                        AuthError::TokenExpired
                    }
                    ErrorKind::InvalidIssuer => {
                        tracing::warn!("Invalid issuer in token");
                        AuthError::InvalidToken
                    }
                    _ => {
                        tracing::debug!("Token validation failed: {}", e);
                        AuthError::InvalidToken
                    }
                }
            })?;

        let claims = data.claims;
        let id: UserId = claims.sub.parse().map_err(|_| {
            tracing::warn!(sub = %claims.sub, "Token subject is not a user id");
            AuthError::InvalidToken
        })?;

        Ok(AuthenticatedUser::new(id, claims.name, claims.role))
    }
}
