//! chat-broker - serves chat sessions over REST and the persistent socket.
//!
//! Configuration comes from `STOREFRONT_CHAT__*` environment variables (and a
//! `.env` file when present). Without `STOREFRONT_CHAT__DATABASE__URL` the
//! broker keeps sessions in memory.

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use storefront_chat::adapters::auth::JwtSessionValidator;
use storefront_chat::adapters::http::{app_router, ChatServices};
use storefront_chat::adapters::memory::InMemoryChatRepository;
use storefront_chat::adapters::postgres::PostgresChatRepository;
use storefront_chat::adapters::websocket::RoomManager;
use storefront_chat::application::ChatBroker;
use storefront_chat::config::{AppConfig, DatabaseConfig};
use storefront_chat::ports::ChatRepository;

type BoxError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    let addr = config.server.socket_addr()?;
    let repository = repository(&config.database).await?;
    let rooms = Arc::new(RoomManager::new(config.chat.room_capacity));
    let broker = Arc::new(ChatBroker::new(
        repository,
        rooms.clone(),
        config.chat.policy(),
    ));
    let validator = Arc::new(JwtSessionValidator::new(config.auth.jwt_config()));

    let app = app_router(
        ChatServices {
            broker,
            rooms,
            validator,
        },
        &config.server,
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        environment = ?config.server.environment,
        "chat broker listening"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("chat broker stopped");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn repository(database: &DatabaseConfig) -> Result<Arc<dyn ChatRepository>, BoxError> {
    let Some(url) = database.url() else {
        tracing::warn!("no database configured, sessions are kept in memory");
        return Ok(Arc::new(InMemoryChatRepository::new()));
    };

    let pool = PgPoolOptions::new()
        .min_connections(database.min_connections)
        .max_connections(database.max_connections)
        .acquire_timeout(database.acquire_timeout())
        .idle_timeout(database.idle_timeout())
        .max_lifetime(database.max_lifetime())
        .connect(url)
        .await?;

    let repository = PostgresChatRepository::new(pool);
    if database.run_migrations {
        repository.migrate().await?;
        tracing::info!("database migrations applied");
    }
    Ok(Arc::new(repository))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
