//! Errors raised while loading or checking [`AppConfig`](super::AppConfig).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment value could not be read into its typed field.
    #[error("could not read configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("configuration rejected: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// A configuration value that parsed but cannot be served with.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must be set")]
    MissingRequired(&'static str),

    #[error("server port must be non-zero")]
    InvalidPort,

    #[error("server host and port do not form a socket address")]
    InvalidBindAddress,

    #[error("request timeout must be between 1 and 300 seconds")]
    InvalidTimeout,

    #[error("database url must use the postgres:// or postgresql:// scheme")]
    InvalidDatabaseUrl,

    #[error("database min_connections is above max_connections")]
    InvalidPoolSize,

    #[error("database max_connections is above 100")]
    PoolSizeTooLarge,

    #[error("chat {0} must be greater than zero")]
    NonPositiveChatSetting(&'static str),
}
