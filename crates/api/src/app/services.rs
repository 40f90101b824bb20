//! Service wiring: credential store, identity directory, decision engine.

use std::sync::Arc;

use sqlx::PgPool;
use tracing::info;

use tenantguard_auth::AccessDecisionEngine;
use tenantguard_infra::{
    AuthConfig, BoundedIdentityDirectory, CredentialManager, IdentityDirectory, InMemoryIdentityDirectory,
    InMemoryRefreshCredentialStore, PostgresIdentityDirectory, PostgresRefreshCredentialStore,
    RefreshCredentialStore, StoreError,
};

#[derive(Clone)]
pub struct AppServices {
    pub credentials: Arc<CredentialManager>,
    pub directory: Arc<dyn IdentityDirectory>,
    pub engine: Arc<AccessDecisionEngine>,
}

impl AppServices {
    /// Directory lookups get the same query timeout as credential store calls.
    pub fn new(
        config: &AuthConfig,
        store: Arc<dyn RefreshCredentialStore>,
        directory: Arc<dyn IdentityDirectory>,
    ) -> Self {
        Self {
            credentials: Arc::new(CredentialManager::new(config, store)),
            directory: Arc::new(BoundedIdentityDirectory::new(directory, config.query_timeout)),
            engine: Arc::new(AccessDecisionEngine::new(config.role_rules.clone())),
        }
    }

    /// In-memory store and directory (dev/tests). Returns the directory
    /// handle so callers can seed identities.
    pub fn in_memory(config: &AuthConfig) -> (Self, Arc<InMemoryIdentityDirectory>) {
        let directory = Arc::new(InMemoryIdentityDirectory::new());
        let services = Self::new(
            config,
            Arc::new(InMemoryRefreshCredentialStore::new()),
            directory.clone(),
        );
        (services, directory)
    }

    /// Postgres-backed store and directory. Applies the schema first.
    pub async fn postgres(config: &AuthConfig, pool: PgPool) -> Result<Self, StoreError> {
        let store = PostgresRefreshCredentialStore::new(pool.clone());
        store.ensure_schema().await?;

        let directory = PostgresIdentityDirectory::new(pool);
        directory.ensure_schema().await?;

        info!("using postgres credential store and identity directory");
        Ok(Self::new(config, Arc::new(store), Arc::new(directory)))
    }
}
