use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tenantguard_core::{CredentialId, IdentityId};

/// A persisted refresh credential (one outstanding session).
///
/// Only the SHA-256 digest of the opaque token value is stored. Rows are never
/// deleted: revoked rows are kept so that a replayed token can be told apart
/// from an unknown one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshCredential {
    pub id: CredentialId,
    pub identity_id: IdentityId,

    /// Lower-case hex SHA-256 of the token value.
    pub token_hash: String,

    pub expires_at: DateTime<Utc>,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl RefreshCredential {
    /// Expiry is passive: a credential is expired once `now` is past `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

/// Refresh credential store error.
///
/// These are **infrastructure errors**; rotation outcomes such as "revoked" or
/// "expired" are not store errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store operation '{0}' timed out")]
    Timeout(&'static str),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Backend(String),
}

/// Persistence boundary for refresh credentials.
///
/// ## Implementation Requirements
///
/// - `token_hash` is unique across all rows
/// - `revoke_if_active` is a single atomic conditional update
///   (`revoked = false → true`) and reports whether *this* call performed the
///   transition; two concurrent calls for the same id must never both observe
///   `true`
/// - nothing is ever deleted
#[async_trait::async_trait]
pub trait RefreshCredentialStore: Send + Sync {
    /// Persist a newly issued credential.
    async fn insert(&self, credential: &RefreshCredential) -> Result<(), StoreError>;

    /// Exact-match lookup by token digest, revoked rows included.
    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<RefreshCredential>, StoreError>;

    /// Revoke a credential only if it is currently not revoked.
    ///
    /// Returns `true` when this call flipped the flag, `false` when the row was
    /// already revoked (or does not exist).
    async fn revoke_if_active(&self, id: CredentialId) -> Result<bool, StoreError>;

    /// Revoke every non-revoked credential of an identity, returning how many
    /// rows changed.
    async fn revoke_all_for_identity(&self, identity_id: IdentityId) -> Result<u64, StoreError>;
}
