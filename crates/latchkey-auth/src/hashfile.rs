//! Hash file format.

use serde::{Deserialize, Serialize};
use std::path::Path;
use subtle::ConstantTimeEq;

use crate::error::{AuthError, Result};
use crate::token::hash_token;

/// One authorised identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Who the token belongs to, typically a mail address.
    #[serde(alias = "Mail")]
    pub identity: String,

    /// Hex SHA-256 of `token + salt`.
    #[serde(alias = "Hash")]
    pub hash: String,

    /// Disabled records never authenticate. Missing means disabled.
    #[serde(alias = "Enabled", default)]
    pub enabled: bool,
}

impl TokenRecord {
    /// Create an enabled record for a freshly issued token.
    pub fn issue(identity: impl Into<String>, token: &str, salt: &str) -> Self {
        Self {
            identity: identity.into(),
            hash: hash_token(token, salt),
            enabled: true,
        }
    }
}

/// Contents of the hash file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashFile {
    /// Salt appended to every token before hashing.
    #[serde(alias = "Salt", default)]
    pub salt: String,

    /// Known tokens.
    #[serde(alias = "HashTable", default)]
    pub tokens: Vec<TokenRecord>,
}

impl HashFile {
    /// Parse a hash file from JSON text.
    ///
    /// # Errors
    ///
    /// Returns the JSON error; [`read`](Self::read) wraps it with the path.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let mut file: Self = serde_json::from_str(json)?;
        for record in &mut file.tokens {
            record.hash.make_ascii_lowercase();
        }
        Ok(file)
    }

    /// Read and parse the file at `path`.
    ///
    /// # Errors
    ///
    /// [`AuthError::Io`] if the file cannot be read,
    /// [`AuthError::Parse`] if it is not a valid hash table.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| AuthError::io(path, e))?;
        Self::from_json(&json).map_err(|e| AuthError::parse(path, e))
    }

    /// Write the file to `path` as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// [`AuthError::Io`] if the file cannot be written.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|e| AuthError::parse(path, e))?;
        std::fs::write(path, json).map_err(|e| AuthError::io(path, e))
    }

    /// Number of enabled records.
    pub fn enabled_count(&self) -> usize {
        self.tokens.iter().filter(|r| r.enabled).count()
    }

    /// Find the enabled record matching `token`.
    ///
    /// Every enabled hash is compared in constant time, with no early exit.
    pub fn find(&self, token: &str) -> Option<&TokenRecord> {
        let hash = hash_token(token, &self.salt);
        let mut found = None;

        for record in self.tokens.iter().filter(|r| r.enabled) {
            let equal: bool = hash.as_bytes().ct_eq(record.hash.as_bytes()).into();
            if equal && found.is_none() {
                found = Some(record);
            }
        }

        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const CURRENT: &str = r#"{
        "salt": "pepper",
        "tokens": [
            { "identity": "alice@example.org", "hash": "HASH_A", "enabled": true },
            { "identity": "bob@example.org", "hash": "HASH_B", "enabled": false }
        ]
    }"#;

    const LEGACY: &str = r#"{
        "Salt": "pepper",
        "HashTable": [
            { "Mail": "alice@example.org", "Hash": "HASH_A", "Enabled": true },
            { "Mail": "bob@example.org", "Hash": "HASH_B" }
        ]
    }"#;

    fn with_hashes(json: &str) -> String {
        json.replace("HASH_A", &hash_token("alpha", "pepper"))
            .replace("HASH_B", &hash_token("bravo", "pepper"))
    }

    #[rstest]
    #[case(CURRENT)]
    #[case(LEGACY)]
    fn test_both_layouts_parse(#[case] json: &str) {
        let file = HashFile::from_json(&with_hashes(json)).unwrap();

        assert_eq!(file.salt, "pepper");
        assert_eq!(file.tokens.len(), 2);
        assert_eq!(file.enabled_count(), 1);
        assert_eq!(file.tokens[0].identity, "alice@example.org");
    }

    #[rstest]
    #[case("alpha", Some("alice@example.org"))]
    #[case("bravo", None)]
    #[case("charlie", None)]
    #[case("", None)]
    fn test_find(#[case] token: &str, #[case] identity: Option<&str>) {
        let file = HashFile::from_json(&with_hashes(CURRENT)).unwrap();
        assert_eq!(file.find(token).map(|r| r.identity.as_str()), identity);
    }

    #[test]
    fn test_uppercase_hashes_match() {
        let json = with_hashes(CURRENT).replace(
            &hash_token("alpha", "pepper"),
            &hash_token("alpha", "pepper").to_ascii_uppercase(),
        );
        let file = HashFile::from_json(&json).unwrap();
        assert!(file.find("alpha").is_some());
    }

    #[test]
    fn test_empty_object_is_empty_table() {
        let file = HashFile::from_json("{}").unwrap();
        assert_eq!(file, HashFile::default());
        assert!(file.find("").is_none());
    }

    #[test]
    fn test_issue_round_trips_through_find() {
        let file = HashFile {
            salt: "s".to_string(),
            tokens: vec![TokenRecord::issue("carol", "secret", "s")],
        };
        assert_eq!(file.find("secret").map(|r| r.identity.as_str()), Some("carol"));
    }
}
