//! User, chat and message storage for Parlor.
//!
//! This crate provides the storage abstraction behind the Parlor server:
//! the [`ChatStore`] trait, an in-memory implementation for tests and dev
//! mode, and a SQLite implementation backed by sqlx.

mod error;
mod memory;
mod sqlite;
mod traits;

pub use error::*;
pub use memory::*;
pub use sqlite::*;
pub use traits::*;
