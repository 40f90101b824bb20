use std::sync::Arc;
use std::time::Duration;

use tenantguard_auth::Identity;
use tenantguard_core::IdentityId;

use crate::credentials::StoreError;

use super::IdentityDirectory;

/// Applies the store query timeout to every lookup of the wrapped directory.
pub struct BoundedIdentityDirectory {
    inner: Arc<dyn IdentityDirectory>,
    timeout: Duration,
}

impl BoundedIdentityDirectory {
    pub fn new(inner: Arc<dyn IdentityDirectory>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }
}

#[async_trait::async_trait]
impl IdentityDirectory for BoundedIdentityDirectory {
    async fn find(&self, id: IdentityId) -> Result<Option<Identity>, StoreError> {
        tokio::time::timeout(self.timeout, self.inner.find(id))
            .await
            .map_err(|_| StoreError::Timeout("find_identity"))?
    }
}

#[cfg(test)]
mod tests {
    use tenantguard_auth::Role;
    use tenantguard_core::TenantId;

    use super::*;
    use crate::directory::InMemoryIdentityDirectory;

    struct StalledDirectory;

    #[async_trait::async_trait]
    impl IdentityDirectory for StalledDirectory {
        async fn find(&self, _: IdentityId) -> Result<Option<Identity>, StoreError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(None)
        }
    }

    #[tokio::test]
    async fn slow_lookups_time_out() {
        let directory = BoundedIdentityDirectory::new(Arc::new(StalledDirectory), Duration::from_millis(20));

        let started = std::time::Instant::now();
        let err = directory.find(IdentityId::new()).await.unwrap_err();

        assert_eq!(err, StoreError::Timeout("find_identity"));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn fast_lookups_pass_through() {
        let inner = Arc::new(InMemoryIdentityDirectory::new());
        let identity = Identity::new(IdentityId::new(), TenantId::new(), Role::GUEST);
        inner.upsert(identity.clone()).unwrap();

        let directory = BoundedIdentityDirectory::new(inner, Duration::from_secs(1));
        assert_eq!(directory.find(identity.id).await.unwrap(), Some(identity));
    }
}
