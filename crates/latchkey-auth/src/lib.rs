//! Token authentication for the latch gateway.
//!
//! Tokens are never stored. The hash file holds a salt and, per identity,
//! the hex SHA-256 of `token + salt`:
//!
//! ```json
//! {
//!   "salt": "pepper",
//!   "tokens": [
//!     { "identity": "alice@example.org", "hash": "9f86d0...", "enabled": true }
//!   ]
//! }
//! ```
//!
//! The capitalized keys of older hash files (`Salt`, `HashTable`, `Mail`,
//! `Hash`, `Enabled`) are accepted as well.
//!
//! [`TokenAuthenticator`] re-reads the file whenever its modification time
//! changes, so tokens can be added or disabled without a restart.
//!
//! # Examples
//!
//! ```
//! use latchkey_auth::{HashFile, TokenAuthenticator, TokenRecord, generate_token};
//!
//! let token = generate_token();
//! let file = HashFile {
//!     salt: "pepper".to_string(),
//!     tokens: vec![TokenRecord::issue("alice@example.org", &token, "pepper")],
//! };
//!
//! let dir = std::env::temp_dir().join(format!("latchkey-doc-{}", std::process::id()));
//! std::fs::create_dir_all(&dir).unwrap();
//! let path = dir.join("hashes.json");
//! file.write(&path).unwrap();
//!
//! let auth = TokenAuthenticator::open(&path).unwrap();
//! assert!(auth.authenticate(&token));
//! assert!(!auth.authenticate("guess"));
//! # std::fs::remove_dir_all(&dir).unwrap();
//! ```

pub mod authenticator;
pub mod error;
pub mod hashfile;
pub mod token;

pub use authenticator::TokenAuthenticator;
pub use error::{AuthError, Result};
pub use hashfile::{HashFile, TokenRecord};
pub use token::{TOKEN_LENGTH, generate_token, hash_token};
