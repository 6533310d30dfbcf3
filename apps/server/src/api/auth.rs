//! Login endpoint.

use auth::verify_password;
use axum::{Json, extract::State};
use chat_store::ChatStore;
use entities::User;
use serde::{Deserialize, Serialize};

use crate::error::ServerResult;
use crate::state::SharedState;

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// Handles `POST /auth/login`.
///
/// Unknown usernames and wrong passwords answer with the same error so
/// the response does not reveal which part was wrong.
pub async fn login<S: ChatStore>(
    State(state): State<SharedState<S>>,
    Json(request): Json<LoginRequest>,
) -> ServerResult<Json<LoginResponse>> {
    let username = request.username.to_lowercase();

    let user = state
        .store
        .get_user_by_username(&username)
        .await?
        .ok_or(auth::AuthError::InvalidCredentials)?;

    let valid = user
        .password_hash
        .as_deref()
        .is_some_and(|hash| verify_password(&request.password, hash));
    if !valid {
        return Err(auth::AuthError::InvalidCredentials.into());
    }

    let token = state
        .jwt_manager
        .generate_token(user.id, user.username.clone())?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(LoginResponse {
        token,
        user: user.without_password(),
    }))
}
