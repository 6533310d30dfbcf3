//! Message entity definition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message posted to a chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier.
    pub id: Uuid,
    /// Chat this message belongs to.
    pub chat_id: Uuid,
    /// User who sent it.
    pub sender_id: Uuid,
    /// Message body.
    pub content: String,
    /// When this message was sent.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Creates a new message.
    pub fn new(chat_id: Uuid, sender_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            chat_id,
            sender_id,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let chat_id = Uuid::new_v4();
        let sender_id = Uuid::new_v4();
        let message = Message::new(chat_id, sender_id, "hello");

        assert_eq!(message.chat_id, chat_id);
        assert_eq!(message.sender_id, sender_id);
        assert_eq!(message.content, "hello");
    }
}
