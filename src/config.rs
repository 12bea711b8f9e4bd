use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::auth::filter;

pub const DEFAULT_SEARCH_FILTER: &str = "(uid=%s)";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub ldap: LdapConfig,
    pub cors: CorsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LdapConfig {
    pub url: String,
    pub base_dn: String,
    pub bind_dn: String,
    pub bind_password: String,
    pub search_filter: String,
    /// Bound on connect and on each directory operation; 0 leaves it to the client library.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub console: bool,
}

impl std::fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapConfig")
            .field("url", &self.url)
            .field("base_dn", &self.base_dn)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"<redacted>")
            .field("search_filter", &self.search_filter)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            ldap: LdapConfig::default(),
            cors: CorsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self { enabled: false }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            console: true,
        }
    }
}

impl Default for LdapConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            base_dn: String::new(),
            bind_dn: String::new(),
            bind_password: String::new(),
            search_filter: DEFAULT_SEARCH_FILTER.to_string(),
            timeout_secs: 10,
        }
    }
}

impl LdapConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Overlay settings from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Overlay settings from `lookup`. Unset variables leave the current value alone.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("ENABLE_CORS") {
            self.cors.enabled = value.to_lowercase() == "true";
        }

        if let Some(value) = lookup("LDAP_URL") {
            self.ldap.url = value;
        }
        if let Some(value) = lookup("LDAP_BASE_DN") {
            self.ldap.base_dn = value;
        }
        if let Some(value) = lookup("LDAP_BIND_DN") {
            self.ldap.bind_dn = value;
        }
        if let Some(value) = lookup("LDAP_BIND_PASSWORD") {
            self.ldap.bind_password = value;
        }
        if let Some(value) = lookup("LDAP_SEARCH_FILTER") {
            if !value.is_empty() {
                self.ldap.search_filter = value;
            }
        }
        if let Some(value) = lookup("LDAP_TIMEOUT_SECS") {
            self.ldap.timeout_secs = value
                .trim()
                .parse()
                .map_err(|_| anyhow!("Invalid LDAP_TIMEOUT_SECS: {}", value))?;
        }

        if let Some(value) = lookup("LOG_LEVEL") {
            if !value.is_empty() {
                self.logging.level = value.to_lowercase();
            }
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow!("Invalid port: {}", self.server.port));
        }

        self.server.bind_address.parse::<std::net::IpAddr>()
            .map_err(|_| anyhow!("Invalid bind address: {}", self.server.bind_address))?;

        if self.ldap.url.is_empty() {
            return Err(anyhow!("LDAP URL is not configured (set LDAP_URL)"));
        }

        if self.ldap.base_dn.is_empty() {
            return Err(anyhow!("LDAP base DN is not configured (set LDAP_BASE_DN)"));
        }

        filter::validate_template(&self.ldap.search_filter)
            .map_err(|e| anyhow!("Invalid LDAP search filter {:?}: {}", self.ldap.search_filter, e))?;

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(anyhow!("Invalid log level: {}", self.logging.level));
        }

        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.bind_address, self.server.port);
        addr.parse().map_err(|e| anyhow!("Failed to parse bind address: {}", e))
    }
}
