use async_trait::async_trait;
use ldap_login::auth::directory::{
    DirectoryClient, DirectoryConnection, DirectoryEntry, SearchRequest,
};
use ldap_login::config::LdapConfig;
use ldap_login::{CredentialVerifier, DirectoryError};
use std::sync::{Arc, Mutex};

pub const SERVICE_DN: &str = "cn=readonly,dc=example,dc=com";
pub const SERVICE_PASSWORD: &str = "readonly";

#[derive(Debug, Clone)]
pub struct FakeEntry {
    pub uid: String,
    pub dn: String,
    pub password: String,
}

#[derive(Debug, Default)]
pub struct Recorded {
    pub connects: usize,
    pub closes: usize,
    pub binds: Vec<String>,
    pub filters: Vec<String>,
}

/// In-memory directory. An entry matches a search when the filter contains
/// `(uid=<escaped uid>)`, so compound templates work as well.
#[derive(Clone, Default)]
pub struct FakeDirectory {
    entries: Vec<FakeEntry>,
    unreachable: bool,
    recorded: Arc<Mutex<Recorded>>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, uid: &str, dn: &str, password: &str) -> Self {
        self.entries.push(FakeEntry {
            uid: uid.to_string(),
            dn: dn.to_string(),
            password: password.to_string(),
        });
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn recorded(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap()
    }
}

pub struct FakeConnection {
    entries: Vec<FakeEntry>,
    recorded: Arc<Mutex<Recorded>>,
}

#[async_trait]
impl DirectoryClient for FakeDirectory {
    type Connection = FakeConnection;

    async fn connect(&self, _url: &str) -> Result<FakeConnection, DirectoryError> {
        if self.unreachable {
            return Err(DirectoryError::Connect("connection refused".to_string()));
        }
        self.recorded.lock().unwrap().connects += 1;
        Ok(FakeConnection {
            entries: self.entries.clone(),
            recorded: Arc::clone(&self.recorded),
        })
    }
}

#[async_trait]
impl DirectoryConnection for FakeConnection {
    async fn bind(&mut self, dn: &str, password: &str) -> Result<(), DirectoryError> {
        self.recorded.lock().unwrap().binds.push(dn.to_string());

        let service = dn == SERVICE_DN && password == SERVICE_PASSWORD;
        let user = self.entries.iter().any(|e| e.dn == dn && e.password == password);
        if service || user {
            Ok(())
        } else {
            Err(DirectoryError::Bind {
                code: 49,
                message: "invalidCredentials".to_string(),
            })
        }
    }

    async fn search(&mut self, request: &SearchRequest) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        self.recorded.lock().unwrap().filters.push(request.filter.clone());

        Ok(self
            .entries
            .iter()
            .filter(|e| request.filter.contains(&format!("(uid={})", ldap3::ldap_escape(e.uid.as_str()))))
            .map(|e| DirectoryEntry { dn: e.dn.clone() })
            .collect())
    }

    async fn close(&mut self) {
        self.recorded.lock().unwrap().closes += 1;
    }
}

pub fn ldap_config() -> LdapConfig {
    LdapConfig {
        url: "ldap://directory.test:389".to_string(),
        base_dn: "dc=example,dc=com".to_string(),
        bind_dn: SERVICE_DN.to_string(),
        bind_password: SERVICE_PASSWORD.to_string(),
        ..LdapConfig::default()
    }
}

pub fn verifier(directory: FakeDirectory) -> CredentialVerifier<FakeDirectory> {
    CredentialVerifier::new(Arc::new(ldap_config()), directory).unwrap()
}

/// Directory from the jdoe walkthrough, plus two entries sharing a uid.
pub fn example_directory() -> FakeDirectory {
    FakeDirectory::new()
        .with_user("jdoe", "uid=jdoe,ou=people,dc=example,dc=com", "correct")
        .with_user("admin", "uid=admin,ou=people,dc=example,dc=com", "admin-pw")
        .with_user("twin", "uid=twin,ou=people,dc=example,dc=com", "pw")
        .with_user("twin", "uid=twin,ou=contractors,dc=example,dc=com", "pw")
}
