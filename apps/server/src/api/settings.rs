//! Settings endpoints.

use axum::{
    Extension,
    Json,
    extract::{Path, State},
};
use chat_store::ChatStore;
use entities::Settings;
use serde_json::{Map, Value};

use crate::error::ServerResult;
use crate::middleware::AuthenticatedUser;
use crate::services::settings;
use crate::state::SharedState;

/// Handles `POST /users/me/settings`: applies a batch of changes
/// atomically. Any invalid key or value rejects the whole batch.
pub async fn update_settings<S: ChatStore>(
    State(state): State<SharedState<S>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(updates): Json<Map<String, Value>>,
) -> ServerResult<Json<Settings>> {
    let settings = settings::update_settings(&state.store, user.id, updates).await?;
    Ok(Json(settings))
}

/// Handles `POST /users/me/settings/:key`: changes a single key. The body
/// is the bare JSON value.
pub async fn update_setting<S: ChatStore>(
    State(state): State<SharedState<S>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(key): Path<String>,
    Json(value): Json<Value>,
) -> ServerResult<Json<Settings>> {
    let settings = settings::update_setting(&state.store, user.id, &key, value).await?;
    Ok(Json(settings))
}
