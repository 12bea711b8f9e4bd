use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AuthError;

pub mod directory;
pub mod filter;
pub mod ldap;
pub mod verifier;

pub use verifier::CredentialVerifier;

/// A username/password pair as submitted by a client.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Check a credential pair.
    /// Returns Ok(()) if the credentials are valid, or the reason they were not accepted.
    async fn authenticate(&self, credentials: &Credentials) -> Result<(), AuthError>;
}
