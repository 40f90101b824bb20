use std::collections::HashMap;
use std::sync::RwLock;

use tenantguard_core::{CredentialId, IdentityId};

use super::r#trait::{RefreshCredential, RefreshCredentialStore, StoreError};

#[derive(Debug, Default)]
struct Rows {
    by_id: HashMap<CredentialId, RefreshCredential>,
    by_hash: HashMap<String, CredentialId>,
}

/// In-memory refresh credential store.
///
/// Intended for tests/dev. All mutations happen under one write lock, which
/// makes `revoke_if_active` atomic.
#[derive(Debug, Default)]
pub struct InMemoryRefreshCredentialStore {
    rows: RwLock<Rows>,
}

impl InMemoryRefreshCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows, revoked ones included.
    pub fn len(&self) -> usize {
        self.rows.read().map(|rows| rows.by_id.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

#[async_trait::async_trait]
impl RefreshCredentialStore for InMemoryRefreshCredentialStore {
    async fn insert(&self, credential: &RefreshCredential) -> Result<(), StoreError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;

        if rows.by_id.contains_key(&credential.id) {
            return Err(StoreError::Conflict(format!("credential {} already exists", credential.id)));
        }
        if rows.by_hash.contains_key(&credential.token_hash) {
            return Err(StoreError::Conflict("token hash already exists".to_string()));
        }

        rows.by_hash.insert(credential.token_hash.clone(), credential.id);
        rows.by_id.insert(credential.id, credential.clone());
        Ok(())
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> Result<Option<RefreshCredential>, StoreError> {
        let rows = self.rows.read().map_err(|_| poisoned())?;
        Ok(rows
            .by_hash
            .get(token_hash)
            .and_then(|id| rows.by_id.get(id))
            .cloned())
    }

    async fn revoke_if_active(&self, id: CredentialId) -> Result<bool, StoreError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        match rows.by_id.get_mut(&id) {
            Some(row) if !row.revoked => {
                row.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_for_identity(&self, identity_id: IdentityId) -> Result<u64, StoreError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        let mut revoked = 0;
        for row in rows.by_id.values_mut() {
            if row.identity_id == identity_id && !row.revoked {
                row.revoked = true;
                revoked += 1;
            }
        }
        Ok(revoked)
    }
}
