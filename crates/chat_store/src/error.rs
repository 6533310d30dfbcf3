//! Chat store error types.

use thiserror::Error;

/// Errors that can occur during chat store operations.
#[derive(Debug, Error)]
pub enum ChatStoreError {
    /// Entity not found.
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// Duplicate entity.
    #[error("{entity_type} already exists: {id}")]
    AlreadyExists {
        entity_type: &'static str,
        id: String,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored value could not be decoded into its entity type.
    #[error("Corrupt {entity_type} row: {detail}")]
    CorruptRow {
        entity_type: &'static str,
        detail: String,
    },

    /// Other error.
    #[error("{0}")]
    Other(String),
}

impl ChatStoreError {
    /// Creates a not found error.
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an already exists error.
    pub fn already_exists(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates a corrupt row error.
    pub fn corrupt_row(entity_type: &'static str, detail: impl Into<String>) -> Self {
        Self::CorruptRow {
            entity_type,
            detail: detail.into(),
        }
    }
}

/// Result type for chat store operations.
pub type ChatStoreResult<T> = Result<T, ChatStoreError>;
