//! Token generation and hashing.

use rand::Rng;
use rand::distributions::Alphanumeric;
use sha2::{Digest, Sha256};

/// Length of generated tokens.
pub const TOKEN_LENGTH: usize = 32;

/// Generate a random alphanumeric token.
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Lowercase hex SHA-256 of `token` followed by `salt`.
///
/// ```
/// assert_eq!(
///     latchkey_auth::hash_token("te", "st"),
///     "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08",
/// );
/// ```
pub fn hash_token(token: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.update(salt.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_tokens() {
        let a = generate_token();
        let b = generate_token();

        assert_eq!(a.len(), TOKEN_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn test_salt_changes_hash() {
        let plain = hash_token("token", "");
        let salted = hash_token("token", "salt");

        assert_eq!(plain.len(), 64);
        assert_ne!(plain, salted);
        assert_eq!(salted, hash_token("tokensalt", ""));
    }
}
