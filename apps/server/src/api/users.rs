//! User endpoints: registration, lookup, search.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chat_store::ChatStore;
use entities::User;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ServerResult;
use crate::services::users::{self, Expand, NewUser, UserView};
use crate::state::SharedState;

/// Expansion flags carried as query parameters. A bare `?friends` counts
/// as enabled; `?friends=false` does not.
#[derive(Debug, Default, Deserialize)]
pub struct ExpandQuery {
    friends: Option<String>,
    chats: Option<String>,
    settings: Option<String>,
}

/// Query parameters for user search.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    like: Option<String>,
    friends: Option<String>,
    chats: Option<String>,
    settings: Option<String>,
}

fn flag(value: &Option<String>) -> bool {
    matches!(value.as_deref(), Some(v) if v != "false" && v != "0")
}

impl From<&ExpandQuery> for Expand {
    fn from(query: &ExpandQuery) -> Self {
        Expand {
            friends: flag(&query.friends),
            chats: flag(&query.chats),
            settings: flag(&query.settings),
        }
    }
}

/// Handles `POST /users` (registration).
pub async fn create_user<S: ChatStore>(
    State(state): State<SharedState<S>>,
    Json(new_user): Json<NewUser>,
) -> ServerResult<(StatusCode, Json<User>)> {
    let user = users::register(&state.store, new_user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Handles `GET /users/:id`.
pub async fn get_user<S: ChatStore>(
    State(state): State<SharedState<S>>,
    Path(id): Path<Uuid>,
    Query(query): Query<ExpandQuery>,
) -> ServerResult<Json<UserView>> {
    let view = users::get_user_view(&state.store, id, Expand::from(&query)).await?;
    Ok(Json(view))
}

/// Handles `GET /users?like=`.
pub async fn search<S: ChatStore>(
    State(state): State<SharedState<S>>,
    Query(query): Query<SearchQuery>,
) -> ServerResult<Json<Vec<UserView>>> {
    let like = query.like.as_deref().unwrap_or_default();
    let expand = Expand {
        friends: flag(&query.friends),
        chats: flag(&query.chats),
        settings: flag(&query.settings),
    };
    let views = users::search_users(&state.store, like, expand).await?;
    Ok(Json(views))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_flag_counts_as_enabled() {
        let query = ExpandQuery {
            friends: Some(String::new()),
            chats: Some("true".to_string()),
            settings: None,
        };
        let expand = Expand::from(&query);
        assert!(expand.friends);
        assert!(expand.chats);
        assert!(!expand.settings);
    }

    #[test]
    fn test_explicit_false_disables_flag() {
        let query = ExpandQuery {
            friends: Some("false".to_string()),
            chats: Some("0".to_string()),
            settings: None,
        };
        let expand = Expand::from(&query);
        assert!(!expand.friends);
        assert!(!expand.chats);
    }
}
