use std::collections::HashMap;
use std::sync::RwLock;

use tenantguard_auth::Identity;
use tenantguard_core::IdentityId;

use crate::credentials::StoreError;

use super::IdentityDirectory;

/// In-memory identity directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryIdentityDirectory {
    identities: RwLock<HashMap<IdentityId, Identity>>,
}

impl InMemoryIdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an identity.
    pub fn upsert(&self, identity: Identity) -> Result<(), StoreError> {
        let mut identities = self.identities.write().map_err(|_| poisoned())?;
        identities.insert(identity.id, identity);
        Ok(())
    }

    pub fn remove(&self, id: IdentityId) -> Result<Option<Identity>, StoreError> {
        let mut identities = self.identities.write().map_err(|_| poisoned())?;
        Ok(identities.remove(&id))
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

#[async_trait::async_trait]
impl IdentityDirectory for InMemoryIdentityDirectory {
    async fn find(&self, id: IdentityId) -> Result<Option<Identity>, StoreError> {
        let identities = self.identities.read().map_err(|_| poisoned())?;
        Ok(identities.get(&id).cloned())
    }
}
