//! Chat entity definition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A chat room. Direct chats have no name; group chats usually do.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    /// Unique identifier.
    pub id: Uuid,
    /// Optional display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// When this chat was created.
    pub created_at: DateTime<Utc>,
}

impl Chat {
    /// Id of the global chat every user is enrolled in at registration.
    pub const GLOBAL_ID: Uuid = Uuid::nil();

    /// Creates a new chat.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            name: None,
            created_at: Utc::now(),
        }
    }

    /// Creates the global chat.
    pub fn global() -> Self {
        Self {
            id: Self::GLOBAL_ID,
            name: Some("global".to_string()),
            created_at: Utc::now(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns true if this is the global chat.
    pub fn is_global(&self) -> bool {
        self.id == Self::GLOBAL_ID
    }
}

impl Default for Chat {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_chat_has_nil_id() {
        let chat = Chat::global();
        assert_eq!(chat.id, Uuid::nil());
        assert!(chat.is_global());
    }

    #[test]
    fn test_new_chat_is_not_global() {
        let chat = Chat::new().with_name("friends");
        assert!(!chat.is_global());
        assert_eq!(chat.name.as_deref(), Some("friends"));
    }
}
