//! Per-chat broadcast rooms for real-time message relay.

use std::{
    collections::HashMap,
    sync::RwLock,
};

use entities::Message;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Capacity for room broadcast channels.
const CHANNEL_CAPACITY: usize = 1024;

/// Registry of per-chat broadcast channels.
///
/// Each chat gets a channel on first subscription; posting a message to a
/// chat with no subscribers is a no-op.
#[derive(Debug, Default)]
pub struct ChatRooms {
    senders: RwLock<HashMap<Uuid, broadcast::Sender<Message>>>,
}

impl ChatRooms {
    /// Creates a new room registry.
    pub fn new() -> Self {
        Self {
            senders: RwLock::new(HashMap::new()),
        }
    }

    /// Subscribes to messages for a chat.
    pub fn subscribe(&self, chat_id: Uuid) -> broadcast::Receiver<Message> {
        let mut senders = self.senders.write().unwrap();

        let sender = senders
            .entry(chat_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0);

        sender.subscribe()
    }

    /// Broadcasts a message to its chat's room.
    pub fn broadcast(&self, message: Message) {
        let senders = self.senders.read().unwrap();

        if let Some(sender) = senders.get(&message.chat_id) {
            // Ignore send errors (no subscribers)
            let _ = sender.send(message);
        }
    }

    /// Returns the subscriber count for a chat.
    pub fn subscriber_count(&self, chat_id: Uuid) -> usize {
        let senders = self.senders.read().unwrap();
        senders
            .get(&chat_id)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }

    /// Drops channels with no subscribers.
    pub fn cleanup_empty_channels(&self) {
        let mut senders = self.senders.write().unwrap();
        senders.retain(|_, sender| sender.receiver_count() > 0);
    }
}
