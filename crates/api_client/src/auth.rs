//! API token credentials.
//!
//! The token key is the HMAC secret for the first link of the signature
//! chain. It is never printed: `Debug` redacts it.

use std::fmt;

/// API token id and secret key. Immutable once constructed.
#[derive(Clone)]
pub struct Credentials {
    token_id: String,
    token_key: Vec<u8>,
}

impl Credentials {
    pub fn new(token_id: impl Into<String>, token_key: impl Into<Vec<u8>>) -> Self {
        Self { token_id: token_id.into(), token_key: token_key.into() }
    }

    /// Token id, sent in the clear in the `Authorization` header.
    pub fn token_id(&self) -> &str {
        &self.token_id
    }

    /// Secret key bytes used to key the signature chain.
    pub fn token_key(&self) -> &[u8] {
        &self.token_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token_id", &self.token_id)
            .field("token_key", &"<redacted>")
            .finish()
    }
}
