//! Chat store trait definitions.

use async_trait::async_trait;
use entities::{Chat, Message, Settings, User};
use uuid::Uuid;

use crate::ChatStoreResult;

/// State of the friend relation between an ordered pair of users.
///
/// The directed variants are relative to the first user of the pair:
/// `PendingOutgoing` means the first user has sent a request to the
/// second that is still unconfirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// No edge in either direction.
    None,
    /// First user has a pending request to the second.
    PendingOutgoing,
    /// Second user has a pending request to the first.
    PendingIncoming,
    /// The users are friends.
    Friends,
}

/// Filter options for listing messages.
#[derive(Debug, Clone, Default)]
pub struct MessageFilter {
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
}

/// Trait for chat storage operations.
///
/// The friend-graph transitions `promote_to_friends` and
/// `remove_relationship` are atomic: either every edge change they imply
/// is applied or none is.
#[async_trait]
pub trait ChatStore: Send + Sync {
    // =========================================================================
    // User operations
    // =========================================================================

    /// Creates a new user.
    async fn create_user(&self, user: User) -> ChatStoreResult<User>;

    /// Gets a user by ID.
    async fn get_user(&self, id: Uuid) -> ChatStoreResult<Option<User>>;

    /// Gets a user by username (exact match).
    async fn get_user_by_username(&self, username: &str) -> ChatStoreResult<Option<User>>;

    /// Gets a user by email (exact match).
    async fn get_user_by_email(&self, email: &str) -> ChatStoreResult<Option<User>>;

    /// Finds users whose name or username contains the given string,
    /// case-insensitively, up to `limit` results.
    async fn search_users(&self, like: &str, limit: u32) -> ChatStoreResult<Vec<User>>;

    /// Updates a user.
    async fn update_user(&self, user: User) -> ChatStoreResult<User>;

    // =========================================================================
    // Settings operations
    // =========================================================================

    /// Gets the settings bag for a user.
    async fn get_settings(&self, user_id: Uuid) -> ChatStoreResult<Option<Settings>>;

    /// Replaces the settings bag for a user. This is the atomic write unit
    /// for batch settings updates.
    async fn put_settings(&self, user_id: Uuid, settings: Settings) -> ChatStoreResult<Settings>;

    // =========================================================================
    // Friend graph operations
    // =========================================================================

    /// Returns the relation state between two users, relative to `a`.
    async fn relation(&self, a: Uuid, b: Uuid) -> ChatStoreResult<Relation>;

    /// Inserts a pending friend request edge from `sender` to `recipient`.
    async fn add_friend_request(&self, sender: Uuid, recipient: Uuid) -> ChatStoreResult<()>;

    /// Removes the pending request edge from `sender` to `recipient`.
    /// Returns true if an edge was removed.
    async fn remove_friend_request(&self, sender: Uuid, recipient: Uuid) -> ChatStoreResult<bool>;

    /// Atomically removes any pending edges between the two users and
    /// inserts the symmetric friendship edge.
    async fn promote_to_friends(&self, a: Uuid, b: Uuid) -> ChatStoreResult<()>;

    /// Atomically removes any pending edges in either direction and the
    /// friendship edge, if present. Idempotent.
    async fn remove_relationship(&self, a: Uuid, b: Uuid) -> ChatStoreResult<()>;

    /// Lists a user's friends.
    async fn list_friends(&self, user_id: Uuid) -> ChatStoreResult<Vec<User>>;

    /// Lists users the given user has sent pending requests to.
    async fn list_requests_sent(&self, user_id: Uuid) -> ChatStoreResult<Vec<User>>;

    /// Lists users with pending requests to the given user.
    async fn list_requests_received(&self, user_id: Uuid) -> ChatStoreResult<Vec<User>>;

    // =========================================================================
    // Chat operations
    // =========================================================================

    /// Creates a new chat.
    async fn create_chat(&self, chat: Chat) -> ChatStoreResult<Chat>;

    /// Gets a chat by ID.
    async fn get_chat(&self, id: Uuid) -> ChatStoreResult<Option<Chat>>;

    /// Adds a user to a chat. Idempotent.
    async fn add_chat_member(&self, chat_id: Uuid, user_id: Uuid) -> ChatStoreResult<()>;

    /// Returns true if the user is a member of the chat.
    async fn is_chat_member(&self, chat_id: Uuid, user_id: Uuid) -> ChatStoreResult<bool>;

    /// Lists the members of a chat.
    async fn list_chat_members(&self, chat_id: Uuid) -> ChatStoreResult<Vec<User>>;

    /// Lists the chats a user belongs to.
    async fn list_chats_for_user(&self, user_id: Uuid) -> ChatStoreResult<Vec<Chat>>;

    // =========================================================================
    // Message operations
    // =========================================================================

    /// Creates a new message.
    async fn create_message(&self, message: Message) -> ChatStoreResult<Message>;

    /// Gets a message by ID.
    async fn get_message(&self, id: Uuid) -> ChatStoreResult<Option<Message>>;

    /// Lists messages in a chat ordered by creation time, with the total
    /// count before pagination.
    async fn list_messages(
        &self,
        chat_id: Uuid,
        filter: MessageFilter,
    ) -> ChatStoreResult<(Vec<Message>, u32)>;
}
