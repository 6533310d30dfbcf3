//! Parlor chat server
//!
//! REST + WebSocket backend for the Parlor chat application: accounts,
//! friend requests, chats, messages, per-user settings, and profile
//! pictures, over a pluggable [`chat_store::ChatStore`].

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod rooms;
pub mod services;
pub mod state;
pub mod ws;

use auth::{JwtConfig, JwtManager};
use axum::Router;
use chat_store::ChatStore;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::state::{SharedState, create_shared_state};

/// Creates the application router with all routes configured.
pub fn create_app<S: ChatStore + 'static>(state: SharedState<S>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    api::create_router(state.clone())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Creates the application state with the given configuration and store.
pub fn create_state<S: ChatStore>(config: Config, store: S) -> SharedState<S> {
    if !config.jwt_secret_from_env {
        tracing::warn!("PARLOR_JWT_SECRET not set, using an insecure development secret");
    }

    let jwt_config = JwtConfig::new(&config.jwt_secret)
        .with_expiration_hours(config.jwt_expiration_hours);
    let jwt_manager = JwtManager::new(jwt_config);

    create_shared_state(config, store, jwt_manager)
}

/// Initializes tracing with the given log level.
pub fn init_tracing(log_level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}
