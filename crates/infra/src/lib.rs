//! Infrastructure layer: configuration, credential persistence and lifecycle,
//! identity lookup.

pub mod config;
pub mod credentials;
pub mod directory;

pub use config::{AuthConfig, Config, ConfigError, SigningSecret};
pub use credentials::{
    CredentialError, CredentialManager, InMemoryRefreshCredentialStore, IssuedCredentials,
    PostgresRefreshCredentialStore, RefreshCredential, RefreshCredentialStore, StoreError,
};
pub use directory::{
    BoundedIdentityDirectory, IdentityDirectory, InMemoryIdentityDirectory, PostgresIdentityDirectory,
};
