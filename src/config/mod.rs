//! Broker configuration.
//!
//! Everything is read from `STOREFRONT_CHAT__<SECTION>__<FIELD>` environment
//! variables, with a `.env` file honoured in development. Every field has a
//! default, so an empty environment yields a working in-memory broker.
//!
//! ```no_run
//! use storefront_chat::config::AppConfig;
//!
//! let config = AppConfig::load().expect("configuration");
//! config.validate().expect("valid configuration");
//! println!("listening on {:?}", config.server.socket_addr());
//! ```

mod auth;
mod chat;
mod database;
mod error;
mod server;

pub use auth::AuthConfig;
pub use chat::ChatConfig;
pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

const ENV_PREFIX: &str = "STOREFRONT_CHAT";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub chat: ChatConfig,
}

impl AppConfig {
    /// Reads the environment (after `.env`, if one exists) into typed
    /// sections. `STOREFRONT_CHAT__SERVER__PORT=9000` sets `server.port`.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "ignoring unreadable .env file");
            }
        }

        let source = config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__");
        Ok(config::Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()?)
    }

    /// Checks every section; the auth section needs the environment.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.auth.validate(&self.server.environment)?;
        self.chat.validate()
    }

    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}
