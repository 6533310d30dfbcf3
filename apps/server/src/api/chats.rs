//! Chat and message endpoints.

use axum::{
    Extension,
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chat_store::{ChatStore, MessageFilter};
use entities::{Chat, Message, User};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ServerError, ServerResult};
use crate::middleware::AuthenticatedUser;
use crate::state::SharedState;

/// Request to create a chat. The creator is always a member and does not
/// need to list themselves.
#[derive(Debug, Deserialize)]
pub struct CreateChatRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub members: Vec<Uuid>,
}

/// A chat with its member list.
#[derive(Debug, Serialize)]
pub struct ChatView {
    #[serde(flatten)]
    pub chat: Chat,
    pub members: Vec<User>,
}

/// Request to post a message.
#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub content: String,
}

/// Query parameters for message listing.
#[derive(Debug, Default, Deserialize)]
pub struct MessagesQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// A page of messages with the total count before pagination.
#[derive(Debug, Serialize)]
pub struct MessagesPage {
    pub messages: Vec<Message>,
    pub total: u32,
}

fn strip_all(users: Vec<User>) -> Vec<User> {
    users.into_iter().map(User::without_password).collect()
}

async fn require_member<S: ChatStore>(
    state: &SharedState<S>,
    chat_id: Uuid,
    user_id: Uuid,
) -> ServerResult<Chat> {
    let chat = state
        .store
        .get_chat(chat_id)
        .await?
        .ok_or_else(|| ServerError::InvalidRequest("Chat not found".to_string()))?;

    if !state.store.is_chat_member(chat_id, user_id).await? {
        return Err(ServerError::PermissionDenied(
            "You are not a member of this chat".to_string(),
        ));
    }
    Ok(chat)
}

/// Handles `POST /chats`. Every listed member must exist; the creator is
/// added implicitly.
pub async fn create_chat<S: ChatStore>(
    State(state): State<SharedState<S>>,
    Extension(user): Extension<AuthenticatedUser>,
    Json(request): Json<CreateChatRequest>,
) -> ServerResult<(StatusCode, Json<ChatView>)> {
    for member in &request.members {
        if state.store.get_user(*member).await?.is_none() {
            return Err(ServerError::InvalidRequest("User not found".to_string()));
        }
    }

    let mut chat = Chat::new();
    if let Some(name) = request.name {
        chat = chat.with_name(name);
    }
    let chat = state.store.create_chat(chat).await?;

    state.store.add_chat_member(chat.id, user.id).await?;
    for member in &request.members {
        state.store.add_chat_member(chat.id, *member).await?;
    }

    tracing::info!(chat_id = %chat.id, creator = %user.id, "Chat created");

    let members = strip_all(state.store.list_chat_members(chat.id).await?);
    Ok((StatusCode::CREATED, Json(ChatView { chat, members })))
}

/// Handles `GET /chats/:id`. Members only.
pub async fn get_chat<S: ChatStore>(
    State(state): State<SharedState<S>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
) -> ServerResult<Json<ChatView>> {
    let chat = require_member(&state, id, user.id).await?;
    let members = strip_all(state.store.list_chat_members(id).await?);
    Ok(Json(ChatView { chat, members }))
}

/// Handles `GET /chats/:id/messages`. Members only.
pub async fn list_messages<S: ChatStore>(
    State(state): State<SharedState<S>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Query(query): Query<MessagesQuery>,
) -> ServerResult<Json<MessagesPage>> {
    require_member(&state, id, user.id).await?;

    let filter = MessageFilter {
        limit: query.limit,
        offset: query.offset,
    };
    let (messages, total) = state.store.list_messages(id, filter).await?;
    Ok(Json(MessagesPage { messages, total }))
}

/// Handles `POST /chats/:id/messages`.
///
/// Stores the message and relays it to the chat's live subscribers.
pub async fn post_message<S: ChatStore>(
    State(state): State<SharedState<S>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<Uuid>,
    Json(request): Json<PostMessageRequest>,
) -> ServerResult<(StatusCode, Json<Message>)> {
    if request.content.trim().is_empty() {
        return Err(ServerError::InvalidRequest(
            "Message content must not be empty".to_string(),
        ));
    }
    require_member(&state, id, user.id).await?;

    let message = state
        .store
        .create_message(Message::new(id, user.id, request.content))
        .await?;

    state.rooms.broadcast(message.clone());

    Ok((StatusCode::CREATED, Json(message)))
}
