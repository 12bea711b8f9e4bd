//! The directory operations the verifier depends on.
//!
//! `auth::ldap` provides the networked implementation; tests substitute an
//! in-memory one.

use async_trait::async_trait;

use crate::error::DirectoryError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    Base,
    OneLevel,
    Subtree,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub base: String,
    pub scope: SearchScope,
    pub filter: String,
    pub attributes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
}

#[async_trait]
pub trait DirectoryClient: Send + Sync {
    type Connection: DirectoryConnection;

    async fn connect(&self, url: &str) -> Result<Self::Connection, DirectoryError>;

    /// Escape a value for use inside a search filter assertion (RFC 4515).
    fn escape_filter(&self, value: &str) -> String {
        ldap3::ldap_escape(value).into_owned()
    }
}

/// An open directory session. Callers must `close` it once done.
#[async_trait]
pub trait DirectoryConnection: Send {
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError>;

    async fn search(&mut self, request: &SearchRequest) -> Result<Vec<DirectoryEntry>, DirectoryError>;

    async fn close(&mut self);
}
