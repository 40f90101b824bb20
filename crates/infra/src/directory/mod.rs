//! Identity lookup after authentication.
//!
//! Access credentials carry only the subject; role and overrides are read
//! from here on every request.

pub mod bounded;
pub mod in_memory;
pub mod postgres;

pub use bounded::BoundedIdentityDirectory;
pub use in_memory::InMemoryIdentityDirectory;
pub use postgres::PostgresIdentityDirectory;

use tenantguard_auth::Identity;
use tenantguard_core::IdentityId;

use crate::credentials::StoreError;

/// Read-side boundary over the user management data this service does not own.
#[async_trait::async_trait]
pub trait IdentityDirectory: Send + Sync {
    async fn find(&self, id: IdentityId) -> Result<Option<Identity>, StoreError>;
}
