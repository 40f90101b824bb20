//! Refresh credential persistence and the credential lifecycle built on it.
//!
//! The store boundary knows nothing about signing; the manager knows nothing
//! about SQL.

pub mod in_memory;
pub mod manager;
pub mod postgres;
pub mod signer;
pub mod token;
pub mod r#trait;

pub use in_memory::InMemoryRefreshCredentialStore;
pub use manager::{CredentialError, CredentialManager, IssuedCredentials};
pub use postgres::PostgresRefreshCredentialStore;
pub use signer::Hs256Signer;
pub use token::{generate_refresh_token, hash_refresh_token};
pub use r#trait::{RefreshCredential, RefreshCredentialStore, StoreError};
