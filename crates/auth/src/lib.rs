//! JWT authentication and password hashing for Parlor.
//!
//! This crate provides:
//! - JWT token generation and validation for bearer auth
//! - Password hashing compatible with the account records

mod error;
mod jwt;
mod password;

pub use error::*;
pub use jwt::*;
pub use password::*;

/// Default JWT expiration time in hours.
pub const DEFAULT_JWT_EXPIRATION_HOURS: u64 = 24;

/// Default JWT issuer.
pub const DEFAULT_JWT_ISSUER: &str = "parlor";
