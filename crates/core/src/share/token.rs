//! Share secrets.

use std::fmt;

use sha2::{Digest, Sha256};

/// Length of an encoded secret: 32 bytes in unpadded base64url.
pub const SECRET_LEN: usize = 43;

/// A freshly generated bearer secret.
///
/// Only ever returned to the caller once; the database keeps the hash.
#[derive(Clone, PartialEq, Eq)]
pub struct ShareSecret(String);

impl ShareSecret {
    /// Generates a secret from 32 random bytes.
    #[must_use]
    pub fn generate() -> Self {
        let bytes: [u8; 32] = rand::random();
        Self(base64_url::encode(&bytes))
    }

    /// Returns the encoded secret.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// SHA-256 hex digest used as the lookup key.
    #[must_use]
    pub fn hash(&self) -> String {
        hash_secret(&self.0)
    }

    /// Consumes the secret, returning the encoded string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for ShareSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ShareSecret([hidden])")
    }
}

/// Hashes a secret for storage and lookup.
#[must_use]
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Cheap shape check before a database lookup.
#[must_use]
pub fn looks_like_secret(value: &str) -> bool {
    value.len() == SECRET_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// Public URL of a share, `<base>/share/<secret>`.
#[must_use]
pub fn share_url(base_url: &str, secret: &ShareSecret) -> String {
    format!("{}/share/{}", base_url.trim_end_matches('/'), secret.as_str())
}
