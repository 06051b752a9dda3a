//! Credential settings for agent and customer callers.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::adapters::auth::JwtConfig;

use super::error::ValidationError;
use super::server::Environment;

/// Signing secret used when none is configured outside production.
const DEVELOPMENT_JWT_SECRET: &str = "storefront-chat-development-secret";

/// HS256 bearer token settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret the storefront signs tokens with.
    pub jwt_secret: SecretString,

    /// Expected `iss` claim, if tokens carry one.
    pub jwt_issuer: Option<String>,
}

impl AuthConfig {
    /// Returns true if a signing secret was configured.
    pub fn has_secret(&self) -> bool {
        !self.jwt_secret.expose_secret().is_empty()
    }

    /// Builds the validator configuration.
    ///
    /// Falls back to a fixed development secret when none is configured;
    /// `validate` refuses that in production.
    pub fn jwt_config(&self) -> JwtConfig {
        let secret = if self.has_secret() {
            self.jwt_secret.expose_secret().clone()
        } else {
            tracing::warn!("no JWT secret configured, using the development secret");
            DEVELOPMENT_JWT_SECRET.to_string()
        };
        let config = JwtConfig::new(secret);
        match &self.jwt_issuer {
            Some(issuer) => config.with_issuer(issuer.clone()),
            None => config,
        }
    }

    /// Production refuses to run on the development secret.
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if *environment == Environment::Production && !self.has_secret() {
            return Err(ValidationError::MissingRequired("AUTH__JWT_SECRET"));
        }
        Ok(())
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: SecretString::new(String::new()),
            jwt_issuer: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_secret_by_default() {
        let config = AuthConfig::default();
        assert!(!config.has_secret());
        assert!(config.jwt_issuer.is_none());
    }

    #[test]
    fn development_tolerates_missing_secret() {
        let config = AuthConfig::default();
        assert!(config.validate(&Environment::Development).is_ok());
    }

    #[test]
    fn production_requires_a_secret() {
        let config = AuthConfig::default();
        assert!(config.validate(&Environment::Production).is_err());

        let config = AuthConfig {
            jwt_secret: SecretString::new("s3cret".to_string()),
            ..Default::default()
        };
        assert!(config.validate(&Environment::Production).is_ok());
    }

    #[test]
    fn debug_output_redacts_secret() {
        let config = AuthConfig {
            jwt_secret: SecretString::new("s3cret".to_string()),
            ..Default::default()
        };
        assert!(!format!("{:?}", config).contains("s3cret"));
    }
}
