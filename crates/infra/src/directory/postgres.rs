//! Postgres-backed identity directory.
//!
//! Reads the `identities` table (`migrations/0002_identities.sql`). Rows are
//! written by user management, never by this service.

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;
use uuid::Uuid;

use tenantguard_auth::{Identity, Role};
use tenantguard_core::{IdentityId, TenantId};

use crate::credentials::StoreError;
use crate::credentials::postgres::map_sqlx_error;

use super::IdentityDirectory;

const SCHEMA: &str = include_str!("../../migrations/0002_identities.sql");

#[derive(Debug, Clone)]
pub struct PostgresIdentityDirectory {
    pool: PgPool,
}

impl PostgresIdentityDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }
}

#[derive(Debug)]
struct IdentityRow {
    id: Uuid,
    tenant_id: Uuid,
    role: String,
    overrides: Vec<String>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for IdentityRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(IdentityRow {
            id: row.try_get("id")?,
            tenant_id: row.try_get("tenant_id")?,
            role: row.try_get("role")?,
            overrides: row.try_get("overrides")?,
        })
    }
}

impl From<IdentityRow> for Identity {
    fn from(row: IdentityRow) -> Self {
        Identity::new(
            IdentityId::from_uuid(row.id),
            TenantId::from_uuid(row.tenant_id),
            Role::new(row.role),
        )
        .with_raw_overrides(row.overrides)
    }
}

#[async_trait::async_trait]
impl IdentityDirectory for PostgresIdentityDirectory {
    #[instrument(skip(self), fields(identity_id = %id), err)]
    async fn find(&self, id: IdentityId) -> Result<Option<Identity>, StoreError> {
        let row = sqlx::query_as::<_, IdentityRow>(
            r#"
            SELECT id, tenant_id, role, overrides
            FROM identities
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_identity", e))?;

        Ok(row.map(Into::into))
    }
}
