//! Core entity definitions for Parlor.
//!
//! This crate defines the data types shared across the Parlor backend:
//! users, per-user settings, chats, and messages. Relations between them
//! (friendships, pending friend requests, chat membership) are owned by the
//! store and are not embedded here.

mod chat;
mod message;
mod settings;
mod user;

pub use chat::*;
pub use message::*;
pub use settings::*;
pub use user::*;
