use super::directory::{DirectoryClient, DirectoryConnection, SearchRequest, SearchScope};
use super::filter::{FilterTemplate, TemplateError};
use super::{Authenticator, Credentials};
use crate::config::LdapConfig;
use crate::error::AuthError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Verifies credentials with a search-then-bind against the directory.
///
/// Every call opens its own connection, binds as the service account, looks up
/// exactly one entry for the username and then binds as that entry with the
/// submitted password. The connection is closed on every path.
pub struct CredentialVerifier<C> {
    config: Arc<LdapConfig>,
    filter: FilterTemplate,
    client: C,
}

impl<C: DirectoryClient> CredentialVerifier<C> {
    pub fn new(config: Arc<LdapConfig>, client: C) -> Result<Self, TemplateError> {
        let filter = FilterTemplate::parse(&config.search_filter)?;
        Ok(Self { config, filter, client })
    }

    pub async fn verify(&self, credentials: &Credentials) -> Result<(), AuthError> {
        // An empty password would turn the user bind into an unauthenticated bind.
        if credentials.username.is_empty() || credentials.password.is_empty() {
            return Err(AuthError::InvalidInput);
        }

        let mut conn = self.client.connect(&self.config.url).await
            .map_err(|e| {
                error!("LDAP connection to {} failed: {}", self.config.url, e);
                AuthError::DirectoryUnavailable(e)
            })?;

        let result = self.verify_on(&mut conn, credentials).await;
        conn.close().await;
        result
    }

    async fn verify_on(&self, conn: &mut C::Connection, credentials: &Credentials) -> Result<(), AuthError> {
        let username = &credentials.username;

        // 1. Bind as the service account to search for the user
        conn.bind(&self.config.bind_dn, &self.config.bind_password).await
            .map_err(|e| {
                error!("LDAP service bind as '{}' failed: {}", self.config.bind_dn, e);
                AuthError::ServiceAuthFailed(e)
            })?;

        // 2. Search for the user DN
        let request = SearchRequest {
            base: self.config.base_dn.clone(),
            scope: SearchScope::Subtree,
            filter: self.filter.render(&self.client.escape_filter(username)),
            attributes: vec!["dn".to_string()],
        };

        let mut entries = match conn.search(&request).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("LDAP search for '{}' failed: {}", username, e);
                return Err(AuthError::UserNotFoundOrAmbiguous);
            }
        };

        if entries.len() != 1 {
            debug!("LDAP lookup for '{}' matched {} entries", username, entries.len());
            return Err(AuthError::UserNotFoundOrAmbiguous);
        }

        let user_dn = entries.remove(0).dn;
        debug!("Found LDAP user DN: {}", user_dn);

        // 3. Verify password by rebinding the same connection as the user
        conn.bind(&user_dn, &credentials.password).await
            .map_err(|e| {
                debug!("LDAP password verification failed for {}: {}", username, e);
                AuthError::InvalidCredentials
            })
    }
}

#[async_trait]
impl<C: DirectoryClient> Authenticator for CredentialVerifier<C> {
    async fn authenticate(&self, credentials: &Credentials) -> Result<(), AuthError> {
        self.verify(credentials).await
    }
}
