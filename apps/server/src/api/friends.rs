//! Friend endpoints.

use axum::{Extension, Json, extract::State};
use chat_store::ChatStore;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::ServerResult;
use crate::middleware::AuthenticatedUser;
use crate::services::friends::{self, FriendOutcome};
use crate::state::SharedState;

/// Body naming the other user of a friend operation.
#[derive(Debug, Deserialize)]
pub struct FriendBody {
    pub friend_id: Uuid,
}

/// Response to a sent friend request.
#[derive(Debug, Serialize)]
pub struct FriendResponse {
    pub status: FriendOutcome,
}

/// Handles `POST /friends`: sends (or mutually accepts) a friend request.
pub async fn send_request<S: ChatStore>(
    State(state): State<SharedState<S>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<FriendBody>,
) -> ServerResult<Json<FriendResponse>> {
    let status = friends::send_request(&state.store, user.id, body.friend_id).await?;
    Ok(Json(FriendResponse { status }))
}

/// Handles `DELETE /friends/requests`: withdraws or rejects a pending
/// request, whichever direction it points.
pub async fn reject_request<S: ChatStore>(
    State(state): State<SharedState<S>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<FriendBody>,
) -> ServerResult<Json<Value>> {
    friends::reject_request(&state.store, user.id, body.friend_id).await?;
    Ok(Json(json!({ "status": "removed" })))
}

/// Handles `DELETE /friends`: unfriends another user.
pub async fn remove_friend<S: ChatStore>(
    State(state): State<SharedState<S>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(body): Json<FriendBody>,
) -> ServerResult<Json<Value>> {
    friends::remove_friend(&state.store, user.id, body.friend_id).await?;
    Ok(Json(json!({ "status": "removed" })))
}
