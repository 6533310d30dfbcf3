//! Application services over the chat store.

pub mod friends;
pub mod settings;
pub mod users;
