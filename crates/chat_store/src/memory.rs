//! In-memory chat store implementation for tests and dev mode.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use entities::{Chat, Message, Settings, User};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{ChatStore, ChatStoreError, ChatStoreResult, MessageFilter, Relation};

/// Orders a pair of user ids canonically so the symmetric friendship edge
/// is stored once.
fn pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
    if a <= b { (a, b) } else { (b, a) }
}

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    settings: HashMap<Uuid, Settings>,
    friendships: HashSet<(Uuid, Uuid)>,
    friend_requests: HashSet<(Uuid, Uuid)>,
    chats: HashMap<Uuid, Chat>,
    chat_members: HashMap<Uuid, HashSet<Uuid>>,
    messages: HashMap<Uuid, Message>,
}

impl Inner {
    fn users_by_ids(&self, ids: impl IntoIterator<Item = Uuid>) -> Vec<User> {
        let mut users: Vec<User> = ids
            .into_iter()
            .filter_map(|id| self.users.get(&id).cloned())
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users
    }
}

/// In-memory chat store.
///
/// All state lives behind one lock so the multi-edge friend transitions
/// are applied under a single critical section.
#[derive(Debug, Default)]
pub struct MemoryChatStore {
    inner: RwLock<Inner>,
}

impl MemoryChatStore {
    /// Creates a new in-memory chat store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    // =========================================================================
    // User operations
    // =========================================================================

    async fn create_user(&self, user: User) -> ChatStoreResult<User> {
        let mut inner = self.inner.write().await;
        if inner.users.contains_key(&user.id) {
            return Err(ChatStoreError::already_exists("User", user.id.to_string()));
        }
        inner.settings.insert(user.id, Settings::default());
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> ChatStoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> ChatStoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> ChatStoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().find(|u| u.email == email).cloned())
    }

    async fn search_users(&self, like: &str, limit: u32) -> ChatStoreResult<Vec<User>> {
        let needle = like.to_lowercase();
        let inner = self.inner.read().await;
        let mut users: Vec<User> = inner
            .users
            .values()
            .filter(|u| {
                u.username.contains(&needle) || u.name.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users.truncate(limit as usize);
        Ok(users)
    }

    async fn update_user(&self, user: User) -> ChatStoreResult<User> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&user.id) {
            return Err(ChatStoreError::not_found("User", user.id.to_string()));
        }
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    // =========================================================================
    // Settings operations
    // =========================================================================

    async fn get_settings(&self, user_id: Uuid) -> ChatStoreResult<Option<Settings>> {
        let inner = self.inner.read().await;
        Ok(inner.settings.get(&user_id).cloned())
    }

    async fn put_settings(&self, user_id: Uuid, settings: Settings) -> ChatStoreResult<Settings> {
        let mut inner = self.inner.write().await;
        if !inner.users.contains_key(&user_id) {
            return Err(ChatStoreError::not_found("User", user_id.to_string()));
        }
        inner.settings.insert(user_id, settings.clone());
        Ok(settings)
    }

    // =========================================================================
    // Friend graph operations
    // =========================================================================

    async fn relation(&self, a: Uuid, b: Uuid) -> ChatStoreResult<Relation> {
        let inner = self.inner.read().await;
        if inner.friendships.contains(&pair(a, b)) {
            Ok(Relation::Friends)
        } else if inner.friend_requests.contains(&(a, b)) {
            Ok(Relation::PendingOutgoing)
        } else if inner.friend_requests.contains(&(b, a)) {
            Ok(Relation::PendingIncoming)
        } else {
            Ok(Relation::None)
        }
    }

    async fn add_friend_request(&self, sender: Uuid, recipient: Uuid) -> ChatStoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.friend_requests.insert((sender, recipient));
        Ok(())
    }

    async fn remove_friend_request(&self, sender: Uuid, recipient: Uuid) -> ChatStoreResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.friend_requests.remove(&(sender, recipient)))
    }

    async fn promote_to_friends(&self, a: Uuid, b: Uuid) -> ChatStoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.friend_requests.remove(&(a, b));
        inner.friend_requests.remove(&(b, a));
        inner.friendships.insert(pair(a, b));
        Ok(())
    }

    async fn remove_relationship(&self, a: Uuid, b: Uuid) -> ChatStoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.friend_requests.remove(&(a, b));
        inner.friend_requests.remove(&(b, a));
        inner.friendships.remove(&pair(a, b));
        Ok(())
    }

    async fn list_friends(&self, user_id: Uuid) -> ChatStoreResult<Vec<User>> {
        let inner = self.inner.read().await;
        let ids: Vec<Uuid> = inner
            .friendships
            .iter()
            .filter_map(|&(a, b)| {
                if a == user_id {
                    Some(b)
                } else if b == user_id {
                    Some(a)
                } else {
                    None
                }
            })
            .collect();
        Ok(inner.users_by_ids(ids))
    }

    async fn list_requests_sent(&self, user_id: Uuid) -> ChatStoreResult<Vec<User>> {
        let inner = self.inner.read().await;
        let ids: Vec<Uuid> = inner
            .friend_requests
            .iter()
            .filter_map(|&(s, r)| (s == user_id).then_some(r))
            .collect();
        Ok(inner.users_by_ids(ids))
    }

    async fn list_requests_received(&self, user_id: Uuid) -> ChatStoreResult<Vec<User>> {
        let inner = self.inner.read().await;
        let ids: Vec<Uuid> = inner
            .friend_requests
            .iter()
            .filter_map(|&(s, r)| (r == user_id).then_some(s))
            .collect();
        Ok(inner.users_by_ids(ids))
    }

    // =========================================================================
    // Chat operations
    // =========================================================================

    async fn create_chat(&self, chat: Chat) -> ChatStoreResult<Chat> {
        let mut inner = self.inner.write().await;
        if inner.chats.contains_key(&chat.id) {
            return Err(ChatStoreError::already_exists("Chat", chat.id.to_string()));
        }
        inner.chat_members.insert(chat.id, HashSet::new());
        inner.chats.insert(chat.id, chat.clone());
        Ok(chat)
    }

    async fn get_chat(&self, id: Uuid) -> ChatStoreResult<Option<Chat>> {
        let inner = self.inner.read().await;
        Ok(inner.chats.get(&id).cloned())
    }

    async fn add_chat_member(&self, chat_id: Uuid, user_id: Uuid) -> ChatStoreResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.chats.contains_key(&chat_id) {
            return Err(ChatStoreError::not_found("Chat", chat_id.to_string()));
        }
        inner.chat_members.entry(chat_id).or_default().insert(user_id);
        Ok(())
    }

    async fn is_chat_member(&self, chat_id: Uuid, user_id: Uuid) -> ChatStoreResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .chat_members
            .get(&chat_id)
            .is_some_and(|members| members.contains(&user_id)))
    }

    async fn list_chat_members(&self, chat_id: Uuid) -> ChatStoreResult<Vec<User>> {
        let inner = self.inner.read().await;
        let ids: Vec<Uuid> = inner
            .chat_members
            .get(&chat_id)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default();
        Ok(inner.users_by_ids(ids))
    }

    async fn list_chats_for_user(&self, user_id: Uuid) -> ChatStoreResult<Vec<Chat>> {
        let inner = self.inner.read().await;
        let mut chats: Vec<Chat> = inner
            .chat_members
            .iter()
            .filter(|(_, members)| members.contains(&user_id))
            .filter_map(|(chat_id, _)| inner.chats.get(chat_id).cloned())
            .collect();
        chats.sort_by_key(|c| c.created_at);
        Ok(chats)
    }

    // =========================================================================
    // Message operations
    // =========================================================================

    async fn create_message(&self, message: Message) -> ChatStoreResult<Message> {
        let mut inner = self.inner.write().await;
        if !inner.chats.contains_key(&message.chat_id) {
            return Err(ChatStoreError::not_found(
                "Chat",
                message.chat_id.to_string(),
            ));
        }
        inner.messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn get_message(&self, id: Uuid) -> ChatStoreResult<Option<Message>> {
        let inner = self.inner.read().await;
        Ok(inner.messages.get(&id).cloned())
    }

    async fn list_messages(
        &self,
        chat_id: Uuid,
        filter: MessageFilter,
    ) -> ChatStoreResult<(Vec<Message>, u32)> {
        let inner = self.inner.read().await;
        let mut result: Vec<Message> = inner
            .messages
            .values()
            .filter(|m| m.chat_id == chat_id)
            .cloned()
            .collect();
        result.sort_by_key(|m| m.created_at);

        let total = result.len() as u32;

        if let Some(offset) = filter.offset {
            result = result.into_iter().skip(offset as usize).collect();
        }
        if let Some(limit) = filter.limit {
            result = result.into_iter().take(limit as usize).collect();
        }

        Ok((result, total))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn user(store: &MemoryChatStore, username: &str) -> User {
        store
            .create_user(User::new(
                username,
                username.to_uppercase(),
                format!("{username}@example.com"),
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_user_crud() {
        let store = MemoryChatStore::new();

        let created = user(&store, "alice").await;

        let fetched = store.get_user(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.username, "alice");

        let by_name = store.get_user_by_username("alice").await.unwrap();
        assert!(by_name.is_some());

        let by_email = store.get_user_by_email("alice@example.com").await.unwrap();
        assert!(by_email.is_some());

        // Duplicate id is rejected
        let dup = store.create_user(created.clone()).await;
        assert!(matches!(dup, Err(ChatStoreError::AlreadyExists { .. })));
    }

    #[tokio::test]
    async fn test_create_user_attaches_default_settings() {
        let store = MemoryChatStore::new();
        let created = user(&store, "alice").await;

        let settings = store.get_settings(created.id).await.unwrap().unwrap();
        assert_eq!(settings.language(), "en");
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_capped() {
        let store = MemoryChatStore::new();
        for name in ["anna", "annabel", "bert"] {
            user(&store, name).await;
        }

        let hits = store.search_users("ANN", 30).await.unwrap();
        assert_eq!(hits.len(), 2);

        let capped = store.search_users("ann", 1).await.unwrap();
        assert_eq!(capped.len(), 1);
    }

    #[tokio::test]
    async fn test_relation_transitions() {
        let store = MemoryChatStore::new();
        let a = user(&store, "alice").await;
        let b = user(&store, "bob").await;

        assert_eq!(store.relation(a.id, b.id).await.unwrap(), Relation::None);

        store.add_friend_request(a.id, b.id).await.unwrap();
        assert_eq!(
            store.relation(a.id, b.id).await.unwrap(),
            Relation::PendingOutgoing
        );
        assert_eq!(
            store.relation(b.id, a.id).await.unwrap(),
            Relation::PendingIncoming
        );

        store.promote_to_friends(a.id, b.id).await.unwrap();
        assert_eq!(store.relation(a.id, b.id).await.unwrap(), Relation::Friends);
        assert_eq!(store.relation(b.id, a.id).await.unwrap(), Relation::Friends);

        // No residual pending edges after promotion
        assert!(store.list_requests_sent(a.id).await.unwrap().is_empty());
        assert!(store.list_requests_received(b.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_relationship_is_idempotent() {
        let store = MemoryChatStore::new();
        let a = user(&store, "alice").await;
        let b = user(&store, "bob").await;

        store.promote_to_friends(a.id, b.id).await.unwrap();
        store.remove_relationship(a.id, b.id).await.unwrap();
        store.remove_relationship(a.id, b.id).await.unwrap();

        assert_eq!(store.relation(a.id, b.id).await.unwrap(), Relation::None);
        assert!(store.list_friends(a.id).await.unwrap().is_empty());
        assert!(store.list_friends(b.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chat_membership_and_messages() {
        let store = MemoryChatStore::new();
        let a = user(&store, "alice").await;

        let chat = store.create_chat(Chat::new().with_name("general")).await.unwrap();
        store.add_chat_member(chat.id, a.id).await.unwrap();
        // Adding twice is fine
        store.add_chat_member(chat.id, a.id).await.unwrap();

        assert!(store.is_chat_member(chat.id, a.id).await.unwrap());
        assert_eq!(store.list_chat_members(chat.id).await.unwrap().len(), 1);
        assert_eq!(store.list_chats_for_user(a.id).await.unwrap().len(), 1);

        for i in 0..3 {
            store
                .create_message(Message::new(chat.id, a.id, format!("msg {i}")))
                .await
                .unwrap();
        }

        let (messages, total) = store
            .list_messages(chat.id, MessageFilter::default())
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content, "msg 0");

        let (page, total) = store
            .list_messages(
                chat.id,
                MessageFilter {
                    limit: Some(1),
                    offset: Some(1),
                },
            )
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].content, "msg 1");
    }

    #[tokio::test]
    async fn test_message_to_unknown_chat_fails() {
        let store = MemoryChatStore::new();
        let a = user(&store, "alice").await;

        let result = store
            .create_message(Message::new(Uuid::new_v4(), a.id, "hello"))
            .await;
        assert!(matches!(result, Err(ChatStoreError::NotFound { .. })));
    }
}
