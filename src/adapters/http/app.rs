//! Assembles the broker's HTTP surface.
//!
//! ```text
//! /health                      liveness
//! /api/chat/...                REST (auth_middleware, bearer optional)
//! /ws/chat?token=              persistent channel
//! ```

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::adapters::websocket::{websocket_router, ChatWsState, RoomManager};
use crate::application::handlers::chat::ChatBroker;
use crate::config::ServerConfig;
use crate::ports::SessionValidator;

use super::chat::{chat_router, health, ChatAppState};
use super::middleware::auth_middleware;

/// Everything the routes share.
#[derive(Clone)]
pub struct ChatServices {
    pub broker: Arc<ChatBroker>,
    pub rooms: Arc<RoomManager>,
    pub validator: Arc<dyn SessionValidator>,
}

/// Builds the complete router: REST API, socket endpoint and health check.
pub fn app_router(services: ChatServices, server: &ServerConfig) -> Router {
    let api = Router::new()
        .nest("/api", chat_router())
        .layer(axum::middleware::from_fn_with_state(
            services.validator.clone(),
            auth_middleware,
        ))
        .layer(TimeoutLayer::new(server.request_timeout()))
        .with_state(ChatAppState::new(services.broker.clone()));

    // The socket endpoint authenticates from its query string and must not
    // be cut off by the request timeout.
    let socket = websocket_router().with_state(ChatWsState::new(
        services.broker,
        services.rooms,
        services.validator,
    ));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .merge(socket)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(server)),
        )
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = server
        .cors_origins_list()
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if origins.is_empty() {
        if server.is_production() {
            tracing::warn!("no CORS origins configured; cross-origin requests will be refused");
            return CorsLayer::new();
        }
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}
