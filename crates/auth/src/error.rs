//! Authentication error types.

use thiserror::Error;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// JWT encoding failed.
    #[error("JWT encoding failed: {0}")]
    JwtEncoding(String),

    /// JWT decoding failed.
    #[error("JWT decoding failed: {0}")]
    JwtDecoding(String),

    /// Token expired.
    #[error("Token expired")]
    TokenExpired,

    /// Invalid token.
    #[error("Invalid token")]
    InvalidToken,

    /// Wrong username or password.
    #[error("Invalid credentials")]
    InvalidCredentials,
}

/// Result type for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;
