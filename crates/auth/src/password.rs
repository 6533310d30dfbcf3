//! Password hashing.
//!
//! Hashes are hex-encoded double SHA-256, matching the format of existing
//! account records.

use sha2::{Digest, Sha256};

/// Hashes a password.
pub fn hash_password(password: &str) -> String {
    let first = hex::encode(Sha256::digest(password.as_bytes()));
    hex::encode(Sha256::digest(first.as_bytes()))
}

/// Verifies a password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> bool {
    hash_password(password) == hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(hash_password("secret"), hash_password("secret"));
    }

    #[test]
    fn test_hash_is_hex_sha256_sized() {
        let hash = hash_password("secret");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_verify() {
        let hash = hash_password("secret");
        assert!(verify_password("secret", &hash));
        assert!(!verify_password("other", &hash));
    }
}
