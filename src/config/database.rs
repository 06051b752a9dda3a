//! Storage settings. The broker persists chat sessions in PostgreSQL when a
//! URL is configured and keeps them in memory otherwise.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Upper bound on `max_connections`.
const POOL_CEILING: u32 = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
    /// Apply the chat schema before serving.
    pub run_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            min_connections: 1,
            max_connections: 20,
            acquire_timeout_secs: 30,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
            run_migrations: true,
        }
    }
}

impl DatabaseConfig {
    /// The PostgreSQL URL, or `None` for in-memory storage. An empty string
    /// counts as unset so `STOREFRONT_CHAT__DATABASE__URL=` disables it.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.is_empty())
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let postgres = |url: &str| ["postgres://", "postgresql://"].iter().any(|s| url.starts_with(s));
        match self.url() {
            Some(url) if !postgres(url) => Err(ValidationError::InvalidDatabaseUrl),
            _ if self.min_connections > self.max_connections => {
                Err(ValidationError::InvalidPoolSize)
            }
            _ if self.max_connections > POOL_CEILING => Err(ValidationError::PoolSizeTooLarge),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_url(url: &str) -> DatabaseConfig {
        DatabaseConfig {
            url: Some(url.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn no_url_selects_in_memory_storage() {
        let config = DatabaseConfig::default();
        assert!(config.url().is_none());
        assert!(config.validate().is_ok());
        assert!(with_url("").url().is_none());
    }

    #[test]
    fn both_postgres_schemes_are_accepted() {
        assert!(with_url("postgres://chat@localhost/chat").validate().is_ok());
        assert!(with_url("postgresql://chat@localhost:5432/chat").validate().is_ok());
        assert_eq!(
            with_url("mysql://localhost/chat").validate(),
            Err(ValidationError::InvalidDatabaseUrl)
        );
    }

    #[test]
    fn pool_bounds_are_checked() {
        let inverted = DatabaseConfig {
            min_connections: 10,
            max_connections: 5,
            ..with_url("postgres://localhost/chat")
        };
        assert_eq!(inverted.validate(), Err(ValidationError::InvalidPoolSize));

        let oversized = DatabaseConfig {
            max_connections: POOL_CEILING + 1,
            ..with_url("postgres://localhost/chat")
        };
        assert_eq!(oversized.validate(), Err(ValidationError::PoolSizeTooLarge));
    }

    #[test]
    fn timeouts_convert_to_durations() {
        let config = DatabaseConfig::default();
        assert_eq!(config.acquire_timeout(), Duration::from_secs(30));
        assert_eq!(config.idle_timeout(), Duration::from_secs(600));
        assert_eq!(config.max_lifetime(), Duration::from_secs(1800));
    }
}
