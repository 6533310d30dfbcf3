//! User service: registration, lookup, search, avatar lifecycle.

use auth::hash_password;
use chat_store::ChatStore;
use chrono::Utc;
use entities::{Chat, Settings, User};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::{ServerError, ServerResult};

/// Maximum number of results returned by a user search.
pub const SEARCH_LIMIT: u32 = 30;

/// Registration payload. There is deliberately no id field: a
/// client-supplied id is rejected by shape rather than stripped after the
/// fact.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub settings: Option<NewUserSettings>,
}

/// Settings accepted at registration. Only the language survives; the
/// rest of the bag starts from defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUserSettings {
    pub language: Option<String>,
}

/// Which relations to expand on a user lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct Expand {
    pub friends: bool,
    pub chats: bool,
    pub settings: bool,
}

/// A user with optionally expanded relations. Expanding `friends` also
/// expands the pending requests in both directions, mirroring a full
/// friend-list view.
#[derive(Debug, Serialize)]
pub struct UserView {
    #[serde(flatten)]
    pub user: User,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friends: Option<Vec<User>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friend_requests_sent: Option<Vec<User>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friend_requests_received: Option<Vec<User>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chats: Option<Vec<Chat>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Settings>,
}

fn strip_all(users: Vec<User>) -> Vec<User> {
    users.into_iter().map(User::without_password).collect()
}

/// Creates the global chat if it does not exist yet.
pub async fn ensure_global_chat<S: ChatStore>(store: &S) -> Result<Chat, chat_store::ChatStoreError> {
    match store.get_chat(Chat::GLOBAL_ID).await? {
        Some(chat) => Ok(chat),
        None => store.create_chat(Chat::global()).await,
    }
}

/// Registers a new user.
///
/// Uniqueness is checked username first, then email, so a record
/// colliding on both reports the username error. The password is hashed,
/// the username lower-cased, a fresh settings bag attached (keeping only
/// a supplied language), and the user joins the global chat.
pub async fn register<S: ChatStore>(store: &S, new_user: NewUser) -> ServerResult<User> {
    let username = new_user.username.to_lowercase();

    if store.get_user_by_username(&username).await?.is_some() {
        return Err(ServerError::InvalidRequest(
            "Username already exists".to_string(),
        ));
    }
    if store.get_user_by_email(&new_user.email).await?.is_some() {
        return Err(ServerError::InvalidRequest(
            "Email already exists".to_string(),
        ));
    }

    let user = User::new(username, new_user.name, new_user.email)
        .with_password_hash(hash_password(&new_user.password));
    let user = store.create_user(user).await?;

    if let Some(language) = new_user.settings.and_then(|s| s.language) {
        let mut settings = store
            .get_settings(user.id)
            .await?
            .unwrap_or_default();
        settings.set("language", json!(language));
        store.put_settings(user.id, settings).await?;
    }

    ensure_global_chat(store).await?;
    store.add_chat_member(Chat::GLOBAL_ID, user.id).await?;

    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok(user.without_password())
}

/// Gets a user by id with the requested relations expanded. Fails with
/// BadRequest when the id is unknown.
pub async fn get_user_view<S: ChatStore>(
    store: &S,
    id: Uuid,
    expand: Expand,
) -> ServerResult<UserView> {
    let user = store
        .get_user(id)
        .await?
        .ok_or_else(|| ServerError::InvalidRequest("User not found".to_string()))?;

    expand_user(store, user, expand).await
}

/// Finds users whose name or username contains `like`, case-insensitively,
/// capped at [`SEARCH_LIMIT`] results. An empty parameter fails before the
/// store is queried.
pub async fn search_users<S: ChatStore>(
    store: &S,
    like: &str,
    expand: Expand,
) -> ServerResult<Vec<UserView>> {
    if like.is_empty() {
        return Err(ServerError::InvalidRequest(
            "Parameter 'like' is required".to_string(),
        ));
    }

    let users = store.search_users(like, SEARCH_LIMIT).await?;
    let mut views = Vec::with_capacity(users.len());
    for user in users {
        views.push(expand_user(store, user, expand).await?);
    }
    Ok(views)
}

async fn expand_user<S: ChatStore>(
    store: &S,
    user: User,
    expand: Expand,
) -> ServerResult<UserView> {
    let (friends, sent, received) = if expand.friends {
        (
            Some(strip_all(store.list_friends(user.id).await?)),
            Some(strip_all(store.list_requests_sent(user.id).await?)),
            Some(strip_all(store.list_requests_received(user.id).await?)),
        )
    } else {
        (None, None, None)
    };

    let chats = if expand.chats {
        Some(store.list_chats_for_user(user.id).await?)
    } else {
        None
    };

    let settings = if expand.settings {
        store.get_settings(user.id).await?
    } else {
        None
    };

    Ok(UserView {
        user: user.without_password(),
        friends,
        friend_requests_sent: sent,
        friend_requests_received: received,
        chats,
        settings,
    })
}

/// Stores a new avatar path on the user record.
pub async fn set_avatar_path<S: ChatStore>(
    store: &S,
    user_id: Uuid,
    path: String,
) -> ServerResult<User> {
    let mut user = store
        .get_user(user_id)
        .await?
        .ok_or_else(|| ServerError::InvalidRequest("User not found".to_string()))?;
    user.avatar_path = Some(path);
    user.updated_at = Utc::now();
    Ok(store.update_user(user).await?.without_password())
}

/// Clears the stored avatar path. The file itself stays on disk.
pub async fn clear_avatar_path<S: ChatStore>(store: &S, user_id: Uuid) -> ServerResult<User> {
    let mut user = store
        .get_user(user_id)
        .await?
        .ok_or_else(|| ServerError::InvalidRequest("User not found".to_string()))?;
    user.avatar_path = None;
    user.updated_at = Utc::now();
    Ok(store.update_user(user).await?.without_password())
}

#[cfg(test)]
mod tests {
    use chat_store::MemoryChatStore;

    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            name: username.to_uppercase(),
            email: email.to_string(),
            password: "secret".to_string(),
            settings: None,
        }
    }

    #[tokio::test]
    async fn test_register_hashes_and_strips_password() {
        let store = MemoryChatStore::new();
        let user = register(&store, new_user("Alice", "alice@example.com"))
            .await
            .unwrap();

        // Returned record has no hash, stored record has one
        assert!(user.password_hash.is_none());
        let stored = store.get_user(user.id).await.unwrap().unwrap();
        let hash = stored.password_hash.unwrap();
        assert!(auth::verify_password("secret", &hash));
    }

    #[tokio::test]
    async fn test_register_lowercases_username_and_joins_global_chat() {
        let store = MemoryChatStore::new();
        let user = register(&store, new_user("AlIcE", "alice@example.com"))
            .await
            .unwrap();

        assert_eq!(user.username, "alice");
        assert!(store
            .is_chat_member(Chat::GLOBAL_ID, user.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_username_beats_duplicate_email() {
        let store = MemoryChatStore::new();
        register(&store, new_user("alice", "alice@example.com"))
            .await
            .unwrap();

        // Collides on both; the username error must win
        let err = register(&store, new_user("alice", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Username already exists"));

        // Collides on email only
        let err = register(&store, new_user("alice2", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Email already exists"));
    }

    #[tokio::test]
    async fn test_register_preserves_supplied_language_only() {
        let store = MemoryChatStore::new();
        let mut request = new_user("alice", "alice@example.com");
        request.settings = Some(NewUserSettings {
            language: Some("de".to_string()),
        });

        let user = register(&store, request).await.unwrap();
        let settings = store.get_settings(user.id).await.unwrap().unwrap();
        assert_eq!(settings.language(), "de");
        // Other defaults untouched
        assert_eq!(settings.get("notifications"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_get_user_view_unknown_id_is_bad_request() {
        let store = MemoryChatStore::new();
        let err = get_user_view(&store, Uuid::new_v4(), Expand::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_search_rejects_empty_like_before_querying() {
        let store = MemoryChatStore::new();
        let err = search_users(&store, "", Expand::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_expansion_includes_requests_with_friends() {
        let store = MemoryChatStore::new();
        let alice = register(&store, new_user("alice", "alice@example.com"))
            .await
            .unwrap();
        let bob = register(&store, new_user("bob", "bob@example.com"))
            .await
            .unwrap();
        store.add_friend_request(alice.id, bob.id).await.unwrap();

        let view = get_user_view(
            &store,
            alice.id,
            Expand {
                friends: true,
                chats: true,
                settings: true,
            },
        )
        .await
        .unwrap();

        assert_eq!(view.friends.as_ref().unwrap().len(), 0);
        assert_eq!(view.friend_requests_sent.as_ref().unwrap().len(), 1);
        assert_eq!(view.chats.as_ref().unwrap().len(), 1);
        assert!(view.settings.is_some());
        // Expanded users are password-stripped too
        assert!(view.friend_requests_sent.as_ref().unwrap()[0]
            .password_hash
            .is_none());
    }

    #[tokio::test]
    async fn test_avatar_path_set_and_clear() {
        let store = MemoryChatStore::new();
        let user = register(&store, new_user("alice", "alice@example.com"))
            .await
            .unwrap();

        let updated = set_avatar_path(&store, user.id, "avatars/x.png".to_string())
            .await
            .unwrap();
        assert_eq!(updated.avatar_path.as_deref(), Some("avatars/x.png"));

        let cleared = clear_avatar_path(&store, user.id).await.unwrap();
        assert!(cleared.avatar_path.is_none());
    }
}
