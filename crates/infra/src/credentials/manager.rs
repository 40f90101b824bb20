//! Credential lifecycle: issue, verify, rotate, revoke.
//!
//! Access credentials are stateless HS256 tokens; refresh credentials are
//! opaque single-use values backed by a [`RefreshCredentialStore`]. Every store
//! call is bounded by the configured query timeout.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use tenantguard_auth::AccessClaims;
use tenantguard_core::{CredentialId, IdentityId};

use crate::config::AuthConfig;

use super::r#trait::{RefreshCredential, RefreshCredentialStore, StoreError};
use super::signer::Hs256Signer;
use super::token::{generate_refresh_token, hash_refresh_token};

#[derive(Debug, Error)]
pub enum CredentialError {
    /// Bad signature, malformed token or outside its time window. Callers
    /// must not be told which.
    #[error("invalid credential")]
    InvalidCredential,

    #[error("refresh credential not found")]
    NotFound,

    /// The presented refresh credential was already consumed. Carries the
    /// owner so the caller can treat it as reuse and end the whole lineage.
    #[error("refresh credential revoked")]
    Revoked { identity_id: IdentityId },

    #[error("refresh credential expired")]
    Expired,

    #[error("failed to sign access credential: {0}")]
    Signing(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CredentialError {
    /// Outcomes that mean "the caller is not authenticated", as opposed to
    /// infrastructure faults.
    pub fn is_rejection(&self) -> bool {
        !matches!(self, CredentialError::Signing(_) | CredentialError::Store(_))
    }
}

/// A freshly issued credential pair.
///
/// The refresh token value exists only here; the store keeps its digest.
#[derive(Clone, Serialize)]
pub struct IssuedCredentials {
    pub identity_id: IdentityId,
    pub access_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_token: String,
    pub refresh_expires_at: DateTime<Utc>,
}

impl core::fmt::Debug for IssuedCredentials {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IssuedCredentials")
            .field("identity_id", &self.identity_id)
            .field("access_expires_at", &self.access_expires_at)
            .field("refresh_expires_at", &self.refresh_expires_at)
            .finish_non_exhaustive()
    }
}

pub struct CredentialManager {
    signer: Hs256Signer,
    store: Arc<dyn RefreshCredentialStore>,
    access_ttl: Duration,
    refresh_ttl: Duration,
    query_timeout: StdDuration,
}

impl core::fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialManager")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("query_timeout", &self.query_timeout)
            .finish_non_exhaustive()
    }
}

impl CredentialManager {
    pub fn new(config: &AuthConfig, store: Arc<dyn RefreshCredentialStore>) -> Self {
        Self {
            signer: Hs256Signer::new(&config.signing_secret),
            store,
            access_ttl: config.access_ttl,
            refresh_ttl: config.refresh_ttl,
            query_timeout: config.query_timeout,
        }
    }

    /// Issue a new access credential and a new refresh credential.
    ///
    /// Timestamps are truncated to whole seconds, the resolution of the
    /// encoded claims.
    #[instrument(skip(self), fields(identity_id = %identity_id), err)]
    pub async fn issue(&self, identity_id: IdentityId, now: DateTime<Utc>) -> Result<IssuedCredentials, CredentialError> {
        let now = now.trunc_subsecs(0);

        let claims = AccessClaims {
            sub: identity_id,
            issued_at: now,
            expires_at: now + self.access_ttl,
        };
        let access_token = self
            .signer
            .sign(&claims)
            .map_err(|e| CredentialError::Signing(e.to_string()))?;

        let refresh_token = generate_refresh_token();
        let credential = RefreshCredential {
            id: CredentialId::new(),
            identity_id,
            token_hash: hash_refresh_token(&refresh_token),
            expires_at: now + self.refresh_ttl,
            revoked: false,
            created_at: now,
        };
        self.bounded("insert", self.store.insert(&credential)).await?;

        info!(credential_id = %credential.id, "credentials issued");

        Ok(IssuedCredentials {
            identity_id,
            access_token,
            access_expires_at: claims.expires_at,
            refresh_token,
            refresh_expires_at: credential.expires_at,
        })
    }

    /// Validate an access credential and return its subject.
    ///
    /// Pure: never touches the store.
    pub fn verify_access(&self, token: &str, now: DateTime<Utc>) -> Result<IdentityId, CredentialError> {
        self.signer
            .validate(token, now)
            .map(|claims| claims.sub)
            .map_err(|_| CredentialError::InvalidCredential)
    }

    /// Exchange a refresh credential for a new pair. The presented credential
    /// is consumed: of any number of concurrent rotations of the same value at
    /// most one succeeds.
    #[instrument(skip_all)]
    pub async fn rotate(&self, presented: &str, now: DateTime<Utc>) -> Result<IssuedCredentials, CredentialError> {
        let token_hash = hash_refresh_token(presented);
        let credential = self
            .bounded("find_by_token_hash", self.store.find_by_token_hash(&token_hash))
            .await?
            .ok_or(CredentialError::NotFound)?;

        if credential.revoked {
            warn!(
                target: "security",
                credential_id = %credential.id,
                identity_id = %credential.identity_id,
                "revoked refresh credential presented"
            );
            return Err(CredentialError::Revoked {
                identity_id: credential.identity_id,
            });
        }
        if credential.is_expired(now) {
            return Err(CredentialError::Expired);
        }

        let won = self
            .bounded("revoke_if_active", self.store.revoke_if_active(credential.id))
            .await?;
        if !won {
            warn!(
                target: "security",
                credential_id = %credential.id,
                identity_id = %credential.identity_id,
                "refresh credential consumed concurrently"
            );
            return Err(CredentialError::Revoked {
                identity_id: credential.identity_id,
            });
        }

        self.issue(credential.identity_id, now).await
    }

    /// Revoke the presented refresh credential (logout). Returns `false` when
    /// it was unknown or already revoked.
    #[instrument(skip_all, err)]
    pub async fn revoke(&self, presented: &str) -> Result<bool, CredentialError> {
        let token_hash = hash_refresh_token(presented);
        let Some(credential) = self
            .bounded("find_by_token_hash", self.store.find_by_token_hash(&token_hash))
            .await?
        else {
            return Ok(false);
        };

        Ok(self
            .bounded("revoke_if_active", self.store.revoke_if_active(credential.id))
            .await?)
    }

    /// Revoke every outstanding refresh credential of an identity.
    #[instrument(skip(self), fields(identity_id = %identity_id), err)]
    pub async fn revoke_all(&self, identity_id: IdentityId) -> Result<u64, CredentialError> {
        let revoked = self
            .bounded("revoke_all_for_identity", self.store.revoke_all_for_identity(identity_id))
            .await?;
        info!(revoked, "refresh credentials revoked");
        Ok(revoked)
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.query_timeout, fut)
            .await
            .map_err(|_| StoreError::Timeout(operation))?
    }
}
