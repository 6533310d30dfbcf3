//! SQLite chat store implementation backed by sqlx.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use entities::{Chat, Message, Settings, User};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use uuid::Uuid;

use crate::{ChatStore, ChatStoreError, ChatStoreResult, MessageFilter, Relation};

/// Schema applied on connect. Ids are TEXT uuids, timestamps RFC 3339
/// TEXT with fixed microsecond precision so lexical ordering matches
/// chronological ordering.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT,
    avatar_path TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS settings (
    user_id TEXT PRIMARY KEY REFERENCES users(id),
    data TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS friendships (
    user_a TEXT NOT NULL,
    user_b TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_a, user_b)
);

CREATE TABLE IF NOT EXISTS friend_requests (
    sender TEXT NOT NULL,
    recipient TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (sender, recipient)
);

CREATE TABLE IF NOT EXISTS chats (
    id TEXT PRIMARY KEY,
    name TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chat_members (
    chat_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    PRIMARY KEY (chat_id, user_id)
);

CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    chat_id TEXT NOT NULL,
    sender_id TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_messages_chat ON messages(chat_id, created_at);
"#;

fn ts(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(entity: &'static str, value: &str) -> ChatStoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ChatStoreError::corrupt_row(entity, format!("bad timestamp {value:?}: {e}")))
}

fn parse_uuid(entity: &'static str, value: &str) -> ChatStoreResult<Uuid> {
    value
        .parse()
        .map_err(|e| ChatStoreError::corrupt_row(entity, format!("bad uuid {value:?}: {e}")))
}

fn user_from_row(row: &SqliteRow) -> ChatStoreResult<User> {
    Ok(User {
        id: parse_uuid("User", &row.try_get::<String, _>("id")?)?,
        username: row.try_get("username")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        avatar_path: row.try_get("avatar_path")?,
        created_at: parse_ts("User", &row.try_get::<String, _>("created_at")?)?,
        updated_at: parse_ts("User", &row.try_get::<String, _>("updated_at")?)?,
    })
}

fn chat_from_row(row: &SqliteRow) -> ChatStoreResult<Chat> {
    Ok(Chat {
        id: parse_uuid("Chat", &row.try_get::<String, _>("id")?)?,
        name: row.try_get("name")?,
        created_at: parse_ts("Chat", &row.try_get::<String, _>("created_at")?)?,
    })
}

fn message_from_row(row: &SqliteRow) -> ChatStoreResult<Message> {
    Ok(Message {
        id: parse_uuid("Message", &row.try_get::<String, _>("id")?)?,
        chat_id: parse_uuid("Message", &row.try_get::<String, _>("chat_id")?)?,
        sender_id: parse_uuid("Message", &row.try_get::<String, _>("sender_id")?)?,
        content: row.try_get("content")?,
        created_at: parse_ts("Message", &row.try_get::<String, _>("created_at")?)?,
    })
}

/// Orders a pair of user ids canonically for the friendships table.
fn pair(a: Uuid, b: Uuid) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// SQLite-backed chat store.
#[derive(Debug, Clone)]
pub struct SqliteChatStore {
    pool: SqlitePool,
}

impl SqliteChatStore {
    /// Connects to the given database URL and applies the schema.
    pub async fn connect(url: &str) -> ChatStoreResult<Self> {
        // An in-memory database exists per connection; a larger pool would
        // hand each caller a different empty database.
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;
        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        tracing::debug!(url, "sqlite chat store connected");
        Ok(Self { pool })
    }
}

#[async_trait]
impl ChatStore for SqliteChatStore {
    // =========================================================================
    // User operations
    // =========================================================================

    async fn create_user(&self, user: User) -> ChatStoreResult<User> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT id FROM users WHERE id = ?1")
            .bind(user.id.to_string())
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Err(ChatStoreError::already_exists("User", user.id.to_string()));
        }

        sqlx::query(
            "INSERT INTO users (id, username, name, email, password_hash, avatar_path, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.avatar_path)
        .bind(ts(user.created_at))
        .bind(ts(user.updated_at))
        .execute(&mut *tx)
        .await?;

        let data = serde_json::to_string(&Settings::default())?;
        sqlx::query("INSERT INTO settings (user_id, data) VALUES (?1, ?2)")
            .bind(user.id.to_string())
            .bind(data)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(user)
    }

    async fn get_user(&self, id: Uuid) -> ChatStoreResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_user_by_username(&self, username: &str) -> ChatStoreResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?1")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> ChatStoreResult<Option<User>> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn search_users(&self, like: &str, limit: u32) -> ChatStoreResult<Vec<User>> {
        let needle = like.to_lowercase();
        let rows = sqlx::query(
            "SELECT * FROM users \
             WHERE instr(lower(username), ?1) > 0 OR instr(lower(name), ?1) > 0 \
             ORDER BY username LIMIT ?2",
        )
        .bind(needle)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn update_user(&self, user: User) -> ChatStoreResult<User> {
        let result = sqlx::query(
            "UPDATE users SET username = ?2, name = ?3, email = ?4, password_hash = ?5, \
             avatar_path = ?6, updated_at = ?7 WHERE id = ?1",
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.avatar_path)
        .bind(ts(user.updated_at))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(ChatStoreError::not_found("User", user.id.to_string()));
        }
        Ok(user)
    }

    // =========================================================================
    // Settings operations
    // =========================================================================

    async fn get_settings(&self, user_id: Uuid) -> ChatStoreResult<Option<Settings>> {
        let row = sqlx::query("SELECT data FROM settings WHERE user_id = ?1")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let data: String = row.try_get("data")?;
                Ok(Some(serde_json::from_str(&data)?))
            }
            None => Ok(None),
        }
    }

    async fn put_settings(&self, user_id: Uuid, settings: Settings) -> ChatStoreResult<Settings> {
        if self.get_user(user_id).await?.is_none() {
            return Err(ChatStoreError::not_found("User", user_id.to_string()));
        }
        let data = serde_json::to_string(&settings)?;
        sqlx::query(
            "INSERT INTO settings (user_id, data) VALUES (?1, ?2) \
             ON CONFLICT(user_id) DO UPDATE SET data = excluded.data",
        )
        .bind(user_id.to_string())
        .bind(data)
        .execute(&self.pool)
        .await?;
        Ok(settings)
    }

    // =========================================================================
    // Friend graph operations
    // =========================================================================

    async fn relation(&self, a: Uuid, b: Uuid) -> ChatStoreResult<Relation> {
        let (lo, hi) = pair(a, b);
        let friends =
            sqlx::query("SELECT 1 FROM friendships WHERE user_a = ?1 AND user_b = ?2")
                .bind(&lo)
                .bind(&hi)
                .fetch_optional(&self.pool)
                .await?;
        if friends.is_some() {
            return Ok(Relation::Friends);
        }

        let outgoing =
            sqlx::query("SELECT 1 FROM friend_requests WHERE sender = ?1 AND recipient = ?2")
                .bind(a.to_string())
                .bind(b.to_string())
                .fetch_optional(&self.pool)
                .await?;
        if outgoing.is_some() {
            return Ok(Relation::PendingOutgoing);
        }

        let incoming =
            sqlx::query("SELECT 1 FROM friend_requests WHERE sender = ?1 AND recipient = ?2")
                .bind(b.to_string())
                .bind(a.to_string())
                .fetch_optional(&self.pool)
                .await?;
        if incoming.is_some() {
            return Ok(Relation::PendingIncoming);
        }

        Ok(Relation::None)
    }

    async fn add_friend_request(&self, sender: Uuid, recipient: Uuid) -> ChatStoreResult<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO friend_requests (sender, recipient, created_at) \
             VALUES (?1, ?2, ?3)",
        )
        .bind(sender.to_string())
        .bind(recipient.to_string())
        .bind(ts(Utc::now()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_friend_request(&self, sender: Uuid, recipient: Uuid) -> ChatStoreResult<bool> {
        let result =
            sqlx::query("DELETE FROM friend_requests WHERE sender = ?1 AND recipient = ?2")
                .bind(sender.to_string())
                .bind(recipient.to_string())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn promote_to_friends(&self, a: Uuid, b: Uuid) -> ChatStoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM friend_requests WHERE (sender = ?1 AND recipient = ?2) \
             OR (sender = ?2 AND recipient = ?1)",
        )
        .bind(a.to_string())
        .bind(b.to_string())
        .execute(&mut *tx)
        .await?;

        let (lo, hi) = pair(a, b);
        sqlx::query(
            "INSERT OR IGNORE INTO friendships (user_a, user_b, created_at) VALUES (?1, ?2, ?3)",
        )
        .bind(lo)
        .bind(hi)
        .bind(ts(Utc::now()))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn remove_relationship(&self, a: Uuid, b: Uuid) -> ChatStoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "DELETE FROM friend_requests WHERE (sender = ?1 AND recipient = ?2) \
             OR (sender = ?2 AND recipient = ?1)",
        )
        .bind(a.to_string())
        .bind(b.to_string())
        .execute(&mut *tx)
        .await?;

        let (lo, hi) = pair(a, b);
        sqlx::query("DELETE FROM friendships WHERE user_a = ?1 AND user_b = ?2")
            .bind(lo)
            .bind(hi)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list_friends(&self, user_id: Uuid) -> ChatStoreResult<Vec<User>> {
        let rows = sqlx::query(
            "SELECT u.* FROM users u JOIN friendships f \
             ON (f.user_a = ?1 AND u.id = f.user_b) OR (f.user_b = ?1 AND u.id = f.user_a) \
             ORDER BY u.username",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn list_requests_sent(&self, user_id: Uuid) -> ChatStoreResult<Vec<User>> {
        let rows = sqlx::query(
            "SELECT u.* FROM users u JOIN friend_requests r ON u.id = r.recipient \
             WHERE r.sender = ?1 ORDER BY u.username",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn list_requests_received(&self, user_id: Uuid) -> ChatStoreResult<Vec<User>> {
        let rows = sqlx::query(
            "SELECT u.* FROM users u JOIN friend_requests r ON u.id = r.sender \
             WHERE r.recipient = ?1 ORDER BY u.username",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(user_from_row).collect()
    }

    // =========================================================================
    // Chat operations
    // =========================================================================

    async fn create_chat(&self, chat: Chat) -> ChatStoreResult<Chat> {
        let existing = sqlx::query("SELECT id FROM chats WHERE id = ?1")
            .bind(chat.id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(ChatStoreError::already_exists("Chat", chat.id.to_string()));
        }

        sqlx::query("INSERT INTO chats (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(chat.id.to_string())
            .bind(&chat.name)
            .bind(ts(chat.created_at))
            .execute(&self.pool)
            .await?;
        Ok(chat)
    }

    async fn get_chat(&self, id: Uuid) -> ChatStoreResult<Option<Chat>> {
        let row = sqlx::query("SELECT * FROM chats WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(chat_from_row).transpose()
    }

    async fn add_chat_member(&self, chat_id: Uuid, user_id: Uuid) -> ChatStoreResult<()> {
        if self.get_chat(chat_id).await?.is_none() {
            return Err(ChatStoreError::not_found("Chat", chat_id.to_string()));
        }
        sqlx::query("INSERT OR IGNORE INTO chat_members (chat_id, user_id) VALUES (?1, ?2)")
            .bind(chat_id.to_string())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn is_chat_member(&self, chat_id: Uuid, user_id: Uuid) -> ChatStoreResult<bool> {
        let row = sqlx::query("SELECT 1 FROM chat_members WHERE chat_id = ?1 AND user_id = ?2")
            .bind(chat_id.to_string())
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn list_chat_members(&self, chat_id: Uuid) -> ChatStoreResult<Vec<User>> {
        let rows = sqlx::query(
            "SELECT u.* FROM users u JOIN chat_members m ON u.id = m.user_id \
             WHERE m.chat_id = ?1 ORDER BY u.username",
        )
        .bind(chat_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn list_chats_for_user(&self, user_id: Uuid) -> ChatStoreResult<Vec<Chat>> {
        let rows = sqlx::query(
            "SELECT c.* FROM chats c JOIN chat_members m ON c.id = m.chat_id \
             WHERE m.user_id = ?1 ORDER BY c.created_at",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(chat_from_row).collect()
    }

    // =========================================================================
    // Message operations
    // =========================================================================

    async fn create_message(&self, message: Message) -> ChatStoreResult<Message> {
        if self.get_chat(message.chat_id).await?.is_none() {
            return Err(ChatStoreError::not_found(
                "Chat",
                message.chat_id.to_string(),
            ));
        }
        sqlx::query(
            "INSERT INTO messages (id, chat_id, sender_id, content, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(message.id.to_string())
        .bind(message.chat_id.to_string())
        .bind(message.sender_id.to_string())
        .bind(&message.content)
        .bind(ts(message.created_at))
        .execute(&self.pool)
        .await?;
        Ok(message)
    }

    async fn get_message(&self, id: Uuid) -> ChatStoreResult<Option<Message>> {
        let row = sqlx::query("SELECT * FROM messages WHERE id = ?1")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(message_from_row).transpose()
    }

    async fn list_messages(
        &self,
        chat_id: Uuid,
        filter: MessageFilter,
    ) -> ChatStoreResult<(Vec<Message>, u32)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE chat_id = ?1")
            .bind(chat_id.to_string())
            .fetch_one(&self.pool)
            .await?;

        let limit = filter.limit.map(i64::from).unwrap_or(-1);
        let offset = filter.offset.map(i64::from).unwrap_or(0);
        let rows = sqlx::query(
            "SELECT * FROM messages WHERE chat_id = ?1 ORDER BY created_at, rowid \
             LIMIT ?2 OFFSET ?3",
        )
        .bind(chat_id.to_string())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let messages = rows
            .iter()
            .map(message_from_row)
            .collect::<ChatStoreResult<Vec<_>>>()?;
        Ok((messages, total as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteChatStore {
        SqliteChatStore::connect("sqlite::memory:").await.unwrap()
    }

    async fn user(store: &SqliteChatStore, username: &str) -> User {
        store
            .create_user(
                User::new(
                    username,
                    username.to_uppercase(),
                    format!("{username}@example.com"),
                )
                .with_password_hash("hash"),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_user_round_trip() {
        let store = store().await;
        let created = user(&store, "alice").await;

        let fetched = store.get_user(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.username, "alice");
        assert_eq!(fetched.email, "alice@example.com");
        assert_eq!(fetched.password_hash.as_deref(), Some("hash"));

        let settings = store.get_settings(created.id).await.unwrap().unwrap();
        assert_eq!(settings.language(), "en");
    }

    #[tokio::test]
    async fn test_search_users() {
        let store = store().await;
        user(&store, "anna").await;
        user(&store, "annabel").await;
        user(&store, "bert").await;

        let hits = store.search_users("ANN", 30).await.unwrap();
        assert_eq!(hits.len(), 2);

        let capped = store.search_users("ann", 1).await.unwrap();
        assert_eq!(capped.len(), 1);
    }

    #[tokio::test]
    async fn test_friend_promotion_clears_requests() {
        let store = store().await;
        let a = user(&store, "alice").await;
        let b = user(&store, "bob").await;

        store.add_friend_request(b.id, a.id).await.unwrap();
        assert_eq!(
            store.relation(a.id, b.id).await.unwrap(),
            Relation::PendingIncoming
        );

        store.promote_to_friends(a.id, b.id).await.unwrap();
        assert_eq!(store.relation(a.id, b.id).await.unwrap(), Relation::Friends);
        assert!(store.list_requests_received(a.id).await.unwrap().is_empty());
        assert_eq!(store.list_friends(b.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_relationship_is_idempotent() {
        let store = store().await;
        let a = user(&store, "alice").await;
        let b = user(&store, "bob").await;

        store.promote_to_friends(a.id, b.id).await.unwrap();
        store.remove_relationship(a.id, b.id).await.unwrap();
        store.remove_relationship(a.id, b.id).await.unwrap();
        assert_eq!(store.relation(a.id, b.id).await.unwrap(), Relation::None);
    }

    #[tokio::test]
    async fn test_messages_paginate_in_order() {
        let store = store().await;
        let a = user(&store, "alice").await;
        let chat = store.create_chat(Chat::new()).await.unwrap();
        store.add_chat_member(chat.id, a.id).await.unwrap();

        for i in 0..5 {
            store
                .create_message(Message::new(chat.id, a.id, format!("msg {i}")))
                .await
                .unwrap();
        }

        let (page, total) = store
            .list_messages(
                chat.id,
                MessageFilter {
                    limit: Some(2),
                    offset: Some(2),
                },
            )
            .await
            .unwrap();
        assert_eq!(total, 5);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].content, "msg 2");
    }

    #[tokio::test]
    async fn test_settings_update_round_trip() {
        let store = store().await;
        let a = user(&store, "alice").await;

        let mut settings = store.get_settings(a.id).await.unwrap().unwrap();
        settings.set("language", serde_json::json!("de"));
        store.put_settings(a.id, settings).await.unwrap();

        let reread = store.get_settings(a.id).await.unwrap().unwrap();
        assert_eq!(reread.language(), "de");
    }
}
