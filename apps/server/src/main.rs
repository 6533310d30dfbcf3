//! Parlor chat server binary.

use std::net::SocketAddr;

use chat_store::SqliteChatStore;
use parlor_server::{config::Config, create_app, create_state, init_tracing, services};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env if present
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    tracing::info!(database_url = %config.database_url, "Starting Parlor server");

    // Connect the chat store
    let store = SqliteChatStore::connect(&config.database_url).await?;

    // The global chat must exist before the first registration
    services::users::ensure_global_chat(&store).await?;

    // Create application state
    let state = create_state(config.clone(), store);

    // Create application router
    let app = create_app(state);

    // Parse server address
    let addr: SocketAddr = config.server_addr().parse()?;

    tracing::info!(addr = %addr, "Server listening");

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
