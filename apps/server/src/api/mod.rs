//! HTTP API routes.

pub mod auth;
pub mod avatar;
pub mod chats;
pub mod friends;
pub mod settings;
pub mod users;

use axum::{
    Json,
    Router,
    middleware::from_fn_with_state,
    routing::{delete, get, post},
};
use chat_store::ChatStore;
use serde_json::{Value, json};

use crate::middleware::auth_middleware;
use crate::state::SharedState;

/// Creates the API router.
///
/// Registration, login, and the health probe are the only routes reachable
/// without a bearer token.
pub fn create_router<S: ChatStore + 'static>(state: SharedState<S>) -> Router<SharedState<S>> {
    let public = Router::new()
        .route("/health", get(health))
        .route("/users", post(users::create_user::<S>))
        .route("/auth/login", post(auth::login::<S>));

    let protected = Router::new()
        .route("/users", get(users::search::<S>))
        .route("/users/:id", get(users::get_user::<S>))
        .route(
            "/friends",
            post(friends::send_request::<S>).delete(friends::remove_friend::<S>),
        )
        .route("/friends/requests", delete(friends::reject_request::<S>))
        .route("/users/me/settings", post(settings::update_settings::<S>))
        .route(
            "/users/me/settings/:key",
            post(settings::update_setting::<S>),
        )
        .route(
            "/users/:id/profilepicture",
            get(avatar::download::<S>)
                .post(avatar::upload::<S>)
                .delete(avatar::remove::<S>),
        )
        .route("/chats", post(chats::create_chat::<S>))
        .route("/chats/:id", get(chats::get_chat::<S>))
        .route(
            "/chats/:id/messages",
            get(chats::list_messages::<S>).post(chats::post_message::<S>),
        )
        .route("/ws", get(crate::ws::handle_websocket::<S>))
        .layer(from_fn_with_state(state, auth_middleware::<S>));

    public.merge(protected)
}

/// Health check endpoint.
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
