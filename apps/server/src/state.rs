//! Application state.

use std::sync::Arc;

use auth::JwtManager;
use chat_store::ChatStore;

use crate::config::Config;
use crate::rooms::ChatRooms;

/// Shared application state.
pub struct AppState<S: ChatStore> {
    /// Server configuration.
    pub config: Config,
    /// Chat store.
    pub store: S,
    /// JWT manager.
    pub jwt_manager: JwtManager,
    /// Per-chat broadcast rooms for the WebSocket relay.
    pub rooms: ChatRooms,
}

impl<S: ChatStore> AppState<S> {
    /// Creates new application state.
    pub fn new(config: Config, store: S, jwt_manager: JwtManager) -> Self {
        Self {
            config,
            store,
            jwt_manager,
            rooms: ChatRooms::new(),
        }
    }
}

/// Type alias for shared state.
pub type SharedState<S> = Arc<AppState<S>>;

/// Creates shared state from config and store.
pub fn create_shared_state<S: ChatStore>(
    config: Config,
    store: S,
    jwt_manager: JwtManager,
) -> SharedState<S> {
    Arc::new(AppState::new(config, store, jwt_manager))
}
