use super::directory::{DirectoryClient, DirectoryConnection, DirectoryEntry, SearchRequest, SearchScope};
use crate::config::LdapConfig;
use crate::error::DirectoryError;
use async_trait::async_trait;
use ldap3::{DerefAliases, Ldap, LdapConnAsync, LdapConnSettings, LdapError, Scope, SearchEntry, SearchOptions};
use std::time::Duration;
use tracing::{debug, trace};

/// Directory client speaking LDAP over the network via `ldap3`.
#[derive(Clone, Debug, Default)]
pub struct LdapClient {
    timeout: Option<Duration>,
}

impl LdapClient {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }

    pub fn from_config(config: &LdapConfig) -> Self {
        Self::new(config.timeout())
    }
}

pub struct LdapConnection {
    ldap: Ldap,
    timeout: Option<Duration>,
}

impl LdapConnection {
    // ldap3 timeouts apply to the next operation only.
    fn op(&mut self) -> &mut Ldap {
        if let Some(timeout) = self.timeout {
            self.ldap.with_timeout(timeout);
        }
        &mut self.ldap
    }
}

fn scope(scope: SearchScope) -> Scope {
    match scope {
        SearchScope::Base => Scope::Base,
        SearchScope::OneLevel => Scope::OneLevel,
        SearchScope::Subtree => Scope::Subtree,
    }
}

fn is_timeout(e: &LdapError) -> bool {
    matches!(e, LdapError::Timeout { .. })
        || matches!(e, LdapError::Io { source } if source.kind() == std::io::ErrorKind::TimedOut)
}

#[async_trait]
impl DirectoryClient for LdapClient {
    type Connection = LdapConnection;

    async fn connect(&self, url: &str) -> Result<LdapConnection, DirectoryError> {
        let mut settings = LdapConnSettings::new();
        if let Some(timeout) = self.timeout {
            settings = settings.set_conn_timeout(timeout);
        }

        let (conn, ldap) = LdapConnAsync::with_settings(settings, url).await
            .map_err(|e| {
                if is_timeout(&e) {
                    DirectoryError::Timeout
                } else {
                    DirectoryError::Connect(e.to_string())
                }
            })?;

        ldap3::drive!(conn);
        debug!("Connected to LDAP server {}", url);

        Ok(LdapConnection {
            ldap,
            timeout: self.timeout,
        })
    }
}

#[async_trait]
impl DirectoryConnection for LdapConnection {
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        let result = self.op().simple_bind(dn, password).await
            .map_err(|e| {
                if is_timeout(&e) {
                    DirectoryError::Timeout
                } else {
                    DirectoryError::Bind { code: 0, message: e.to_string() }
                }
            })?;

        if result.rc != 0 {
            return Err(DirectoryError::Bind {
                code: result.rc,
                message: result.text,
            });
        }

        Ok(())
    }

    async fn search(&mut self, request: &SearchRequest) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        let map_err = |e: LdapError| {
            if is_timeout(&e) {
                DirectoryError::Timeout
            } else {
                DirectoryError::Search(e.to_string())
            }
        };

        trace!("LDAP search base={} filter={}", request.base, request.filter);

        let (entries, _res) = self.op()
            .with_search_options(SearchOptions::new().deref(DerefAliases::Never))
            .search(&request.base, scope(request.scope), &request.filter, request.attributes.clone())
            .await
            .map_err(map_err)?
            .success()
            .map_err(map_err)?;

        Ok(entries
            .into_iter()
            .map(|entry| DirectoryEntry { dn: SearchEntry::construct(entry).dn })
            .collect())
    }

    async fn close(&mut self) {
        if let Err(e) = self.ldap.unbind().await {
            debug!("LDAP unbind failed: {}", e);
        }
    }
}
