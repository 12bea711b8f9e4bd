pub mod auth;
pub mod config;
pub mod error;
pub mod server;

pub use auth::{Authenticator, CredentialVerifier, Credentials};
pub use config::Config;
pub use error::{AuthError, DirectoryError};
pub use server::LoginServer;
